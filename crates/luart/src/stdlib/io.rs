// IO library
// Only io.write is backed (by the runtime's output sink); file access is
// not provided

use crate::lib_registry::LibraryModule;
use crate::lua_value::{CallOutcome, LuaValue, MultiValue};
use crate::lua_vm::{LuaError, LuaResult, LuaVM};

pub fn create_io_lib() -> LibraryModule {
    crate::lib_module!("io", {
        "write" => io_write,
        "read" => io_read,
        "lines" => io_lines,
        "open" => io_open,
        "close" => io_close,
        "flush" => io_flush,
        "input" => io_input,
        "output" => io_output,
        "popen" => io_popen,
        "tmpfile" => io_tmpfile,
        "type" => io_type,
    })
}

/// write(...) - Strings and numbers only, no separators
fn io_write(vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let mut text = String::new();
    for (i, value) in args.iter().enumerate() {
        match value {
            LuaValue::String(_) | LuaValue::Number(_) => text.push_str(&value.to_string_raw()),
            other => {
                return Err(LuaError::Type(format!(
                    "bad argument #{} to 'write' (string expected, got {})",
                    i + 1,
                    other.type_name()
                )));
            }
        }
    }
    vm.write_output(&text)?;
    Ok(CallOutcome::none())
}

fn io_read(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("io.read"))
}

fn io_lines(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("io.lines"))
}

fn io_open(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("io.open"))
}

fn io_close(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("io.close"))
}

fn io_flush(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("io.flush"))
}

fn io_input(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("io.input"))
}

fn io_output(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("io.output"))
}

fn io_popen(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("io.popen"))
}

fn io_tmpfile(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("io.tmpfile"))
}

fn io_type(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("io.type"))
}
