// Operator and call dispatcher
// Native interpretation first, then metamethod fallback, then error
mod arithmetic;
mod call;
mod comparison_ops;
mod concat;
mod metamethod;
mod table_ops;

pub use arithmetic::ArithOp;
pub use metamethod::TmKind;

use crate::lua_value::LuaValue;

/// Operand description used in error messages
pub(crate) fn describe(value: &LuaValue) -> String {
    match value {
        LuaValue::String(s) => format!("string '{s}'"),
        LuaValue::Nil => "nil".to_string(),
        LuaValue::Boolean(b) => format!("boolean {b}"),
        LuaValue::Number(_) => format!("number {}", value.to_string_raw()),
        _ => value.to_string_raw(),
    }
}
