use super::TmKind;
use crate::lua_value::{LuaValue, MultiValue};
use crate::lua_vm::{LuaError, LuaResult, LuaVM};

fn compare_error(a: &LuaValue, b: &LuaValue) -> LuaError {
    LuaError::Compare(format!(
        "cannot compare {} with {}",
        a.type_name(),
        b.type_name()
    ))
}

impl LuaVM {
    /// `==`: raw equality, escalating to `__eq` only for two tables that
    /// share the same handler
    pub fn equals(&mut self, a: &LuaValue, b: &LuaValue) -> LuaResult<bool> {
        if a.raw_equal(b) {
            return Ok(true);
        }
        if !(a.is_table() && b.is_table()) {
            return Ok(false);
        }
        match self.shared_metamethod(a, b, TmKind::Eq) {
            Some(handler) => Ok(self
                .call1(&handler, MultiValue::two(a.clone(), b.clone()))?
                .is_truthy()),
            None => Ok(false),
        }
    }

    /// `<`
    pub fn less_than(&mut self, a: &LuaValue, b: &LuaValue) -> LuaResult<bool> {
        match (a, b) {
            (LuaValue::Number(x), LuaValue::Number(y)) => Ok(x < y),
            (LuaValue::String(x), LuaValue::String(y)) => Ok(x < y),
            _ => match self.shared_metamethod(a, b, TmKind::Lt) {
                Some(handler) => Ok(self
                    .call1(&handler, MultiValue::two(a.clone(), b.clone()))?
                    .is_truthy()),
                None => Err(compare_error(a, b)),
            },
        }
    }

    /// `<=`; without a shared `__le`, falls back to `not (b < a)` through a
    /// shared `__lt`
    pub fn less_equal(&mut self, a: &LuaValue, b: &LuaValue) -> LuaResult<bool> {
        match (a, b) {
            (LuaValue::Number(x), LuaValue::Number(y)) => Ok(x <= y),
            (LuaValue::String(x), LuaValue::String(y)) => Ok(x <= y),
            _ => {
                if let Some(handler) = self.shared_metamethod(a, b, TmKind::Le) {
                    return Ok(self
                        .call1(&handler, MultiValue::two(a.clone(), b.clone()))?
                        .is_truthy());
                }
                if let Some(handler) = self.shared_metamethod(a, b, TmKind::Lt) {
                    return Ok(!self
                        .call1(&handler, MultiValue::two(b.clone(), a.clone()))?
                        .is_truthy());
                }
                Err(compare_error(a, b))
            }
        }
    }
}
