// OS library
// Implements: clock, time, difftime; every other entry raises unsupported

use chrono::{Local, NaiveDate, TimeDelta, TimeZone};

use crate::lib_registry::{LibraryModule, check_number, opt_number};
use crate::lua_value::{CallOutcome, LuaTableRef, LuaValue, MultiValue};
use crate::lua_vm::{LuaError, LuaResult, LuaVM};

pub fn create_os_lib() -> LibraryModule {
    crate::lib_module!("os", {
        "clock" => os_clock,
        "time" => os_time,
        "difftime" => os_difftime,
        "date" => os_date,
        "execute" => os_execute,
        "exit" => os_exit,
        "getenv" => os_getenv,
        "remove" => os_remove,
        "rename" => os_rename,
        "setlocale" => os_setlocale,
        "tmpname" => os_tmpname,
    })
}

/// Seconds since this runtime instance started
fn os_clock(vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Ok(CallOutcome::one(vm.clock()))
}

/// time([table]) - Current epoch seconds, or the local time described by
/// `table` (year, month, day required; hour defaults to 12)
fn os_time(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    match args.arg(1) {
        LuaValue::Nil => Ok(CallOutcome::one(Local::now().timestamp())),
        LuaValue::Table(fields) => Ok(time_from_fields(&fields)?
            .map(LuaValue::from)
            .map(CallOutcome::one)
            .unwrap_or_else(|| CallOutcome::one(LuaValue::Nil))),
        other => Err(LuaError::Type(format!(
            "bad argument #1 to 'time' (table expected, got {})",
            other.type_name()
        ))),
    }
}

fn date_field(fields: &LuaTableRef, key: &str, default: Option<i64>) -> LuaResult<i64> {
    match fields.get_str(key).to_integer() {
        Some(value) => Ok(value),
        None => default.ok_or_else(|| {
            LuaError::Type(format!("field '{key}' missing in date table"))
        }),
    }
}

/// Out of range fields are normalized the way mktime does
fn time_from_fields(fields: &LuaTableRef) -> LuaResult<Option<i64>> {
    let year = date_field(fields, "year", None)?;
    let month = date_field(fields, "month", None)?;
    let day = date_field(fields, "day", None)?;
    let hour = date_field(fields, "hour", Some(12))?;
    let min = date_field(fields, "min", Some(0))?;
    let sec = date_field(fields, "sec", Some(0))?;

    // Overflow anywhere means there is no such time
    let Some(months) = year
        .checked_mul(12)
        .and_then(|m| m.checked_add(month.checked_sub(1)?))
    else {
        return Ok(None);
    };
    let Ok(year) = i32::try_from(months.div_euclid(12)) else {
        return Ok(None);
    };
    let month = months.rem_euclid(12) as u32 + 1;
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
    else {
        return Ok(None);
    };
    let clock = hour
        .checked_mul(3_600)
        .and_then(|s| s.checked_add(min.checked_mul(60)?))
        .and_then(|s| s.checked_add(sec));
    let offset = day
        .checked_sub(1)
        .and_then(|d| d.checked_mul(86_400))
        .and_then(|s| s.checked_add(clock?))
        .and_then(TimeDelta::try_seconds);
    let Some(naive) = offset.and_then(|delta| first.checked_add_signed(delta)) else {
        return Ok(None);
    };
    Ok(Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp()))
}

fn os_difftime(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let t2 = check_number(&args, 1, "difftime")?;
    let t1 = opt_number(&args, 2, "difftime")?.unwrap_or(0.0);
    Ok(CallOutcome::one(t2 - t1))
}

fn os_date(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("os.date"))
}

fn os_execute(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("os.execute"))
}

fn os_exit(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("os.exit"))
}

fn os_getenv(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("os.getenv"))
}

fn os_remove(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("os.remove"))
}

fn os_rename(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("os.rename"))
}

fn os_setlocale(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("os.setlocale"))
}

fn os_tmpname(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("os.tmpname"))
}
