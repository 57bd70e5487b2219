use super::TmKind;
use crate::lua_value::{LuaValue, MultiValue, check_store_key};
use crate::lua_vm::{LuaError, LuaResult, LuaVM};

fn index_error(target: &LuaValue, key: &LuaValue) -> LuaError {
    let message = format!(
        "attempt to index a {} value (key '{}')",
        target.type_name(),
        key.to_string_raw()
    );
    if target.is_nil() {
        LuaError::Key(message)
    } else {
        LuaError::Type(message)
    }
}

fn chain_error(tm: TmKind) -> LuaError {
    LuaError::Type(format!("'{}' chain too long; possible loop", tm.name()))
}

impl LuaVM {
    /// `obj[key]` with `__index` fallback.
    ///
    /// A function handler is called with `(obj, key)` and its first result
    /// used; a table handler is indexed in turn.
    pub fn table_get(&mut self, obj: &LuaValue, key: &LuaValue) -> LuaResult<LuaValue> {
        let mut current = obj.clone();
        for _ in 0..self.safe_option.max_index_chain {
            let handler = match &current {
                LuaValue::Table(t) => {
                    let raw = t.raw_get(key);
                    if !raw.is_nil() {
                        return Ok(raw);
                    }
                    match self.get_metamethod(&current, TmKind::Index) {
                        Some(handler) => handler,
                        None => return Ok(LuaValue::Nil),
                    }
                }
                _ => match self.get_metamethod(&current, TmKind::Index) {
                    Some(handler) => handler,
                    None => return Err(index_error(&current, key)),
                },
            };
            if handler.is_function() {
                return self.call1(&handler, MultiValue::two(current, key.clone()));
            }
            current = handler;
        }
        Err(chain_error(TmKind::Index))
    }

    /// `obj[key] = value` with `__newindex` fallback for absent keys
    pub fn table_set(&mut self, obj: &LuaValue, key: LuaValue, value: LuaValue) -> LuaResult<()> {
        let mut current = obj.clone();
        for _ in 0..self.safe_option.max_index_chain {
            let handler = match &current {
                LuaValue::Table(t) => {
                    check_store_key(&key)?;
                    if !t.raw_get(&key).is_nil() {
                        return t.raw_set(key, value);
                    }
                    match self.get_metamethod(&current, TmKind::NewIndex) {
                        Some(handler) => handler,
                        None => return t.raw_set(key, value),
                    }
                }
                _ => match self.get_metamethod(&current, TmKind::NewIndex) {
                    Some(handler) => handler,
                    None => return Err(index_error(&current, &key)),
                },
            };
            if handler.is_function() {
                self.call(&handler, MultiValue::multiple(vec![current, key, value]))?;
                return Ok(());
            }
            current = handler;
        }
        Err(chain_error(TmKind::NewIndex))
    }

    /// `#v`: character count for strings, `__len` if present, else the
    /// table border
    pub fn len(&mut self, value: &LuaValue) -> LuaResult<LuaValue> {
        if let LuaValue::String(s) = value {
            return Ok(LuaValue::from(s.chars().count()));
        }
        if let Some(handler) = self.get_metamethod(value, TmKind::Len) {
            return self.call1(&handler, MultiValue::single(value.clone()));
        }
        match value {
            LuaValue::Table(t) => Ok(LuaValue::from(t.length())),
            _ => Err(LuaError::Type(format!(
                "attempt to get length of a {} value",
                value.type_name()
            ))),
        }
    }
}
