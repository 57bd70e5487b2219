// Table library
// Implements: concat, getn, insert, maxn, remove, sort
//
// These operate on the array part and keep the table in array mode.

use crate::lib_registry::{LibraryModule, check_integer, check_table, opt_integer, opt_string};
use crate::lua_value::{CallOutcome, LuaValue, MultiValue};
use crate::lua_vm::{LuaError, LuaResult, LuaVM};
use crate::stdlib::sort_table::table_sort;

pub fn create_table_lib() -> LibraryModule {
    crate::lib_module!("table", {
        "concat" => table_concat,
        "getn" => table_getn,
        "insert" => table_insert,
        "maxn" => table_maxn,
        "remove" => table_remove,
        "sort" => table_sort,
    })
}

/// table.concat(list [, sep [, i [, j]]]) - Join string and number elements
fn table_concat(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let table = check_table(&args, 1, "concat")?;
    let sep = opt_string(&args, 2, "concat")?.unwrap_or_default();
    let items = table.borrow_mut().array_items().to_vec();
    let first = opt_integer(&args, 3, "concat")?.unwrap_or(1);
    let last = opt_integer(&args, 4, "concat")?.unwrap_or(items.len() as i64);

    let mut out = String::new();
    for index in first..=last {
        let value = table.get_int(index);
        match value {
            LuaValue::String(_) | LuaValue::Number(_) => out.push_str(&value.to_string_raw()),
            other => {
                return Err(LuaError::Type(format!(
                    "invalid value (at index {index}) in table for 'concat' (got {})",
                    other.type_name()
                )));
            }
        }
        if index < last {
            out.push_str(&sep);
        }
    }
    Ok(CallOutcome::one(out))
}

/// table.getn(list) - Border of the array part
fn table_getn(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let table = check_table(&args, 1, "getn")?;
    Ok(CallOutcome::one(table.length()))
}

/// table.insert(list, [pos,] value)
fn table_insert(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let table = check_table(&args, 1, "insert")?;
    let len = table.borrow_mut().array_items().len();
    let (pos, value) = match args.len() {
        2 => (len + 1, args.arg(2)),
        3 => {
            let pos = check_integer(&args, 2, "insert")?;
            if pos < 1 {
                return Err(LuaError::Type(
                    "bad argument #2 to 'insert' (position out of bounds)".to_string(),
                ));
            }
            (pos as usize, args.arg(3))
        }
        _ => {
            return Err(LuaError::Type(
                "wrong number of arguments to 'insert'".to_string(),
            ));
        }
    };
    table.borrow_mut().array_insert(pos, value)?;
    Ok(CallOutcome::none())
}

/// table.maxn(list) - Largest positive numeric key
fn table_maxn(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let table = check_table(&args, 1, "maxn")?;
    Ok(CallOutcome::one(table.borrow().maxn()))
}

/// table.remove(list [, pos]) - Remove and return an element, default last
fn table_remove(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let table = check_table(&args, 1, "remove")?;
    let len = table.borrow_mut().array_items().len();
    if len == 0 {
        return Ok(CallOutcome::none());
    }
    let pos = opt_integer(&args, 2, "remove")?.unwrap_or(len as i64);
    if pos < 1 {
        return Ok(CallOutcome::one(LuaValue::Nil));
    }
    let removed = table.borrow_mut().array_remove(pos as usize);
    Ok(CallOutcome::one(removed))
}
