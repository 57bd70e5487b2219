// Basic library (_G global functions)
// Implements: print, type, assert, error, tonumber, tostring, select,
// ipairs, pairs, next, unpack, pcall, xpcall, getmetatable, setmetatable,
// rawget, rawset, rawequal, collectgarbage, load, loadstring, require, module
use std::cell::Cell;

use crate::lib_registry::{
    LibraryModule, check_any, check_integer, check_string, check_table, opt_integer,
};
use crate::lua_value::{CallOutcome, LuaValue, MultiValue, parse_number};
use crate::lua_vm::{LuaError, LuaResult, LuaVM, TmKind};
use crate::stdlib::package::{lua_module, lua_require};

pub fn create_basic_lib() -> LibraryModule {
    crate::lib_module!("_G", {
        "print" => lua_print,
        "type" => lua_type,
        "assert" => lua_assert,
        "error" => lua_error,
        "tonumber" => lua_tonumber,
        "tostring" => lua_tostring,
        "select" => lua_select,
        "ipairs" => lua_ipairs,
        "pairs" => lua_pairs,
        "next" => lua_next,
        "unpack" => lua_unpack,
        "pcall" => lua_pcall,
        "xpcall" => lua_xpcall,
        "getmetatable" => lua_getmetatable,
        "setmetatable" => lua_setmetatable,
        "rawget" => lua_rawget,
        "rawset" => lua_rawset,
        "rawequal" => lua_rawequal,
        "collectgarbage" => lua_collectgarbage,
        "load" => lua_load,
        "loadstring" => lua_load,
        "loadfile" => lua_loadfile,
        "dofile" => lua_dofile,
        "getfenv" => lua_getfenv,
        "setfenv" => lua_setfenv,
        "require" => lua_require,
        "module" => lua_module,
    })
    .with_value("_VERSION", |_| LuaValue::from("Lua 5.1"))
}

/// print(...) - Write values to the output sink, tab separated
fn lua_print(vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let mut line = String::new();
    for (i, value) in args.iter().enumerate() {
        if i > 0 {
            line.push('\t');
        }
        line.push_str(&vm.tostring_text(value)?);
    }
    line.push('\n');
    vm.write_output(&line)?;
    Ok(CallOutcome::none())
}

/// type(v) - Return the type of a value as a string
fn lua_type(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let value = check_any(&args, 1, "type")?;
    Ok(CallOutcome::one(value.type_name()))
}

/// assert(v [, message]) - Raise error if v is false or nil, else return
/// every argument
fn lua_assert(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let condition = check_any(&args, 1, "assert")?;
    if condition.is_truthy() {
        return Ok(CallOutcome::values(args));
    }
    match args.arg(2) {
        LuaValue::Nil => Err(LuaError::raise("assertion failed!")),
        message => Err(LuaError::Runtime(message)),
    }
}

/// error(value) - Raise any value; the level argument is accepted and ignored
fn lua_error(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::Runtime(args.first()))
}

/// tonumber(v [, base])
fn lua_tonumber(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let value = check_any(&args, 1, "tonumber")?;
    let Some(base) = opt_integer(&args, 2, "tonumber")? else {
        return Ok(CallOutcome::one(match &value {
            LuaValue::Number(_) => value.clone(),
            LuaValue::String(s) => parse_number(s).map(LuaValue::Number).unwrap_or_default(),
            _ => LuaValue::Nil,
        }));
    };
    if !(2..=36).contains(&base) {
        return Err(LuaError::Type(
            "bad argument #2 to 'tonumber' (base out of range)".to_string(),
        ));
    }
    let text = check_string(&args, 1, "tonumber")?;
    Ok(CallOutcome::one(
        parse_radix(&text, base as u32)
            .map(LuaValue::Number)
            .unwrap_or_default(),
    ))
}

/// Integer text in `radix`, optional leading minus, surrounding whitespace
fn parse_radix(text: &str, radix: u32) -> Option<f64> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    if digits.is_empty() {
        return None;
    }
    let mut value = 0.0f64;
    for c in digits.chars() {
        value = value * radix as f64 + c.to_digit(radix)? as f64;
    }
    Some(if negative { -value } else { value })
}

/// tostring(v) - Honours __tostring
fn lua_tostring(vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let value = check_any(&args, 1, "tostring")?;
    Ok(CallOutcome::one(vm.tostring(&value)?))
}

/// select('#', ...) or select(n, ...); the result replaces the call
fn lua_select(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let selector = check_any(&args, 1, "select")?;
    let rest = args.skip(1);
    if selector.as_str() == Some("#") {
        return Ok(CallOutcome::substituted(MultiValue::single(LuaValue::from(
            rest.len(),
        ))));
    }
    let n = selector.to_integer().ok_or_else(|| {
        LuaError::Type("bad argument #1 to 'select' (number expected)".to_string())
    })?;
    let count = rest.len() as i64;
    let start = if n < 0 { count + n } else { n - 1 };
    if n == 0 || start < 0 {
        return Err(LuaError::Type(
            "bad argument #1 to 'select' (index out of range)".to_string(),
        ));
    }
    Ok(CallOutcome::substituted(rest.skip(start as usize)))
}

/// ipairs(t) - Raw walk over 1, 2, ... until the first nil
fn lua_ipairs(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let table = check_table(&args, 1, "ipairs")?;
    Ok(CallOutcome::values(vec![
        LuaValue::cfunction("ipairs_iter", ipairs_iter),
        LuaValue::Table(table),
        LuaValue::Number(0.0),
    ]))
}

fn ipairs_iter(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let table = check_table(&args, 1, "ipairs")?;
    let index = check_integer(&args, 2, "ipairs")? + 1;
    let value = table.get_int(index);
    if value.is_nil() {
        return Ok(CallOutcome::one(LuaValue::Nil));
    }
    Ok(CallOutcome::values(MultiValue::two(
        LuaValue::from(index),
        value,
    )))
}

/// pairs(t) - Iterate over a snapshot of the keys taken at the call
fn lua_pairs(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let table = check_table(&args, 1, "pairs")?;
    let keys = table.borrow().keys();
    let position = Cell::new(0usize);
    let source = table.clone();
    let iter = LuaValue::closure("pairs_iter", move |_vm, _args| {
        while let Some(key) = keys.get(position.get()) {
            position.set(position.get() + 1);
            let value = source.raw_get(key);
            if !value.is_nil() {
                return Ok(CallOutcome::values(MultiValue::two(key.clone(), value)));
            }
        }
        Ok(CallOutcome::one(LuaValue::Nil))
    });
    Ok(CallOutcome::values(vec![
        iter,
        LuaValue::Table(table),
        LuaValue::Nil,
    ]))
}

/// next(t [, k])
fn lua_next(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let table = check_table(&args, 1, "next")?;
    match table.borrow().next(&args.arg(2))? {
        Some((key, value)) => Ok(CallOutcome::values(MultiValue::two(key, value))),
        None => Ok(CallOutcome::one(LuaValue::Nil)),
    }
}

/// unpack(list [, i [, j]]) - The elements replace the call's result
fn lua_unpack(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let table = check_table(&args, 1, "unpack")?;
    let first = opt_integer(&args, 2, "unpack")?.unwrap_or(1);
    let last = match opt_integer(&args, 3, "unpack")? {
        Some(last) => last,
        None => table.length() as i64,
    };
    if first > last {
        return Ok(CallOutcome::substituted(MultiValue::empty()));
    }
    if last.checked_sub(first).is_none_or(|span| span >= 1 << 24) {
        return Err(LuaError::Type("too many results to unpack".to_string()));
    }
    Ok(CallOutcome::substituted(
        (first..=last).map(|i| table.get_int(i)).collect::<MultiValue>(),
    ))
}

/// pcall(f, ...) - Protected call
fn lua_pcall(vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let func = check_any(&args, 1, "pcall")?;
    Ok(CallOutcome::values(vm.pcall(&func, args.skip(1))))
}

/// xpcall(f, handler, ...) - Protected call with a message handler
fn lua_xpcall(vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let func = check_any(&args, 1, "xpcall")?;
    let handler = check_any(&args, 2, "xpcall")?;
    Ok(CallOutcome::values(vm.xpcall(&func, &handler, args.skip(2))))
}

/// getmetatable(v) - A `__metatable` field hides the real metatable
fn lua_getmetatable(vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let value = check_any(&args, 1, "getmetatable")?;
    let Some(mt) = vm.get_metatable(&value) else {
        return Ok(CallOutcome::one(LuaValue::Nil));
    };
    let protected = mt.get_str(TmKind::Metatable.name());
    if !protected.is_nil() {
        return Ok(CallOutcome::one(protected));
    }
    Ok(CallOutcome::one(LuaValue::Table(mt)))
}

/// setmetatable(t, mt) - Returns t
fn lua_setmetatable(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let table = check_table(&args, 1, "setmetatable")?;
    let mt = match args.arg(2) {
        LuaValue::Nil => None,
        LuaValue::Table(mt) => Some(mt),
        _ => {
            return Err(LuaError::Type(
                "bad argument #2 to 'setmetatable' (nil or table expected)".to_string(),
            ));
        }
    };
    if let Some(current) = table.get_metatable()
        && !current.get_str(TmKind::Metatable.name()).is_nil()
    {
        return Err(LuaError::Type(
            "cannot change a protected metatable".to_string(),
        ));
    }
    table.set_metatable(mt);
    Ok(CallOutcome::one(LuaValue::Table(table)))
}

fn lua_rawget(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let table = check_table(&args, 1, "rawget")?;
    Ok(CallOutcome::one(table.raw_get(&args.arg(2))))
}

fn lua_rawset(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let table = check_table(&args, 1, "rawset")?;
    table.raw_set(args.arg(2), args.arg(3))?;
    Ok(CallOutcome::one(LuaValue::Table(table)))
}

fn lua_rawequal(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let a = check_any(&args, 1, "rawequal")?;
    let b = check_any(&args, 2, "rawequal")?;
    Ok(CallOutcome::one(a.raw_equal(&b)))
}

/// collectgarbage(...) - Memory is host managed; always reports 0
fn lua_collectgarbage(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Ok(CallOutcome::one(0))
}

/// load(chunk) / loadstring(chunk) - Delegates to the installed chunk loader
fn lua_load(vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let Some(loader) = vm.chunk_loader() else {
        return Err(LuaError::unsupported("load"));
    };
    let source = match args.arg(1) {
        LuaValue::String(s) => s,
        _ => return Err(LuaError::unsupported("load from a reader function")),
    };
    match loader(vm, &source) {
        Ok(func) => Ok(CallOutcome::one(func)),
        Err(err) => Ok(CallOutcome::values(MultiValue::two(
            LuaValue::Nil,
            err.to_value(),
        ))),
    }
}

fn lua_loadfile(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("loadfile"))
}

fn lua_dofile(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("dofile"))
}

fn lua_getfenv(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("getfenv"))
}

fn lua_setfenv(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("setfenv"))
}
