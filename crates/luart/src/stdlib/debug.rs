// Debug library
// Implements: getmetatable, setmetatable (raw, ignoring __metatable);
// the introspection entries raise unsupported

use crate::lib_registry::{LibraryModule, check_any};
use crate::lua_value::{CallOutcome, LuaValue, MultiValue};
use crate::lua_vm::{LuaError, LuaResult, LuaVM};

pub fn create_debug_lib() -> LibraryModule {
    crate::lib_module!("debug", {
        "getmetatable" => debug_getmetatable,
        "setmetatable" => debug_setmetatable,
        "traceback" => debug_traceback,
        "getinfo" => debug_getinfo,
        "getlocal" => debug_getlocal,
        "sethook" => debug_sethook,
        "gethook" => debug_gethook,
        "getupvalue" => debug_getupvalue,
        "setupvalue" => debug_setupvalue,
    })
}

fn debug_getmetatable(vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let value = check_any(&args, 1, "getmetatable")?;
    Ok(CallOutcome::one(
        vm.get_metatable(&value)
            .map(LuaValue::Table)
            .unwrap_or_default(),
    ))
}

/// setmetatable(v, mt) - Tables only; strings share the runtime's string
/// metatable and cannot be retargeted here
fn debug_setmetatable(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let value = check_any(&args, 1, "setmetatable")?;
    let mt = match args.arg(2) {
        LuaValue::Nil => None,
        LuaValue::Table(mt) => Some(mt),
        _ => {
            return Err(LuaError::Type(
                "bad argument #2 to 'setmetatable' (nil or table expected)".to_string(),
            ));
        }
    };
    match &value {
        LuaValue::Table(t) => t.set_metatable(mt),
        _ => return Err(LuaError::unsupported("debug.setmetatable on non-table values")),
    }
    Ok(CallOutcome::one(value))
}

fn debug_traceback(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("debug.traceback"))
}

fn debug_getinfo(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("debug.getinfo"))
}

fn debug_getlocal(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("debug.getlocal"))
}

fn debug_sethook(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("debug.sethook"))
}

fn debug_gethook(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("debug.gethook"))
}

fn debug_getupvalue(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("debug.getupvalue"))
}

fn debug_setupvalue(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("debug.setupvalue"))
}
