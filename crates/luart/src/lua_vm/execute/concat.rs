use super::TmKind;
use crate::lua_value::{LuaValue, MultiValue};
use crate::lua_vm::{LuaError, LuaResult, LuaVM};

impl LuaVM {
    /// `..` on two operands.
    ///
    /// Two raw numbers are rejected; at least one side must already be a
    /// string. Anything else goes through `__concat` on either operand.
    pub fn concat(&mut self, a: &LuaValue, b: &LuaValue) -> LuaResult<LuaValue> {
        match (a, b) {
            (LuaValue::Number(_), LuaValue::Number(_)) => Err(LuaError::Unsupported(
                "attempt to concatenate two numbers; convert one to a string first".to_string(),
            )),
            (
                LuaValue::String(_) | LuaValue::Number(_),
                LuaValue::String(_) | LuaValue::Number(_),
            ) => {
                let mut text = a.to_string_raw();
                text.push_str(&b.to_string_raw());
                Ok(LuaValue::from(text))
            }
            _ => {
                let handler = self
                    .get_metamethod(a, TmKind::Concat)
                    .or_else(|| self.get_metamethod(b, TmKind::Concat));
                match handler {
                    Some(handler) => self.call1(&handler, MultiValue::two(a.clone(), b.clone())),
                    None => {
                        let culprit = if matches!(a, LuaValue::String(_) | LuaValue::Number(_)) {
                            b
                        } else {
                            a
                        };
                        Err(LuaError::Type(format!(
                            "attempt to concatenate a {} value",
                            culprit.type_name()
                        )))
                    }
                }
            }
        }
    }
}
