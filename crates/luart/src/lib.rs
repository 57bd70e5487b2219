// Lua Runtime
// Value model, tables, metamethod dispatch and the Lua 5.1 standard library
// for code that calls into the runtime directly instead of through a parser

#[cfg(test)]
mod test;

pub mod lib_registry;
pub mod lua_value;
pub mod lua_vm;
pub mod stdlib;

pub use lib_registry::LibraryRegistry;
pub use lua_value::{CallOutcome, LuaFunctionRef, LuaTable, LuaTableRef, LuaValue, MultiValue};
pub use lua_vm::{LuaError, LuaResult, LuaVM, SafeOption};
pub use stdlib::Stdlib;
