use thiserror::Error;

use crate::lua_value::LuaValue;

/// The single raised-condition channel of the runtime.
///
/// Substituted return sequences never travel here; see `CallOutcome`.
#[derive(Debug, Clone, Error)]
pub enum LuaError {
    /// Unsupported operand, non-callable called, non-indexable indexed
    #[error("{0}")]
    Type(String),
    /// Nil or NaN table key, indexing nil
    #[error("{0}")]
    Key(String),
    /// Module not found, method absent when called
    #[error("{0}")]
    Lookup(String),
    /// Ordering metamethod absent or mismatched
    #[error("{0}")]
    Compare(String),
    /// Pattern construct that cannot be translated, or malformed pattern
    #[error("{0}")]
    Pattern(String),
    /// Deliberately stubbed library entry
    #[error("{0}")]
    Unsupported(String),
    /// Call depth limit exceeded
    #[error("stack overflow")]
    StackOverflow,
    /// Value raised by `error(value)`
    #[error("{}", .0.to_string_raw())]
    Runtime(LuaValue),
}

impl LuaError {
    /// Raise an arbitrary value, as `error(v)` does
    pub fn raise(value: impl Into<LuaValue>) -> Self {
        LuaError::Runtime(value.into())
    }

    pub fn unsupported(what: &str) -> Self {
        LuaError::Unsupported(format!("{what} is not supported"))
    }

    /// The value a protected call reports for this failure
    pub fn to_value(&self) -> LuaValue {
        match self {
            LuaError::Runtime(value) => value.clone(),
            other => LuaValue::from(other.to_string()),
        }
    }
}
