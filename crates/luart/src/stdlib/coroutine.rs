// Coroutine library
// Every entry raises unsupported: the runtime has no resumable tasks

use crate::lib_registry::LibraryModule;
use crate::lua_value::{CallOutcome, MultiValue};
use crate::lua_vm::{LuaError, LuaResult, LuaVM};

pub fn create_coroutine_lib() -> LibraryModule {
    crate::lib_module!("coroutine", {
        "create" => coroutine_create,
        "resume" => coroutine_resume,
        "running" => coroutine_running,
        "status" => coroutine_status,
        "wrap" => coroutine_wrap,
        "yield" => coroutine_yield,
    })
}

fn coroutine_create(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("coroutine.create"))
}

fn coroutine_resume(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("coroutine.resume"))
}

fn coroutine_running(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("coroutine.running"))
}

fn coroutine_status(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("coroutine.status"))
}

fn coroutine_wrap(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("coroutine.wrap"))
}

fn coroutine_yield(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("coroutine.yield"))
}
