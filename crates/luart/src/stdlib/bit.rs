// Bit operations library (32-bit semantics)
// Implements: tobit, tohex, bnot, bor, band, bxor, lshift, rshift, arshift,
// rol, ror, bswap
//
// Operands are reduced modulo 2^32 and results are signed 32-bit numbers.

use crate::lib_registry::{LibraryModule, check_number, opt_integer};
use crate::lua_value::{CallOutcome, MultiValue};
use crate::lua_vm::{LuaResult, LuaVM};

pub fn create_bit_lib() -> LibraryModule {
    crate::lib_module!("bit", {
        "tobit" => bit_tobit,
        "tohex" => bit_tohex,
        "bnot" => bit_bnot,
        "bor" => bit_bor,
        "band" => bit_band,
        "bxor" => bit_bxor,
        "lshift" => bit_lshift,
        "rshift" => bit_rshift,
        "arshift" => bit_arshift,
        "rol" => bit_rol,
        "ror" => bit_ror,
        "bswap" => bit_bswap,
    })
}

/// Wrap a number into the signed 32-bit range
pub(crate) fn to_bit(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    let wrapped = n.trunc() % 4294967296.0;
    (wrapped as i64) as u32 as i32
}

fn arg_bits(args: &MultiValue, index: usize, name: &str) -> LuaResult<i32> {
    Ok(to_bit(check_number(args, index, name)?))
}

fn bit_result(x: i32) -> LuaResult<CallOutcome> {
    Ok(CallOutcome::one(x))
}

fn bit_tobit(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    bit_result(arg_bits(&args, 1, "tobit")?)
}

/// tohex(x [, n]): n hex digits (default 8), uppercase when n is negative
fn bit_tohex(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let x = arg_bits(&args, 1, "tohex")? as u32;
    let n = opt_integer(&args, 2, "tohex")?.unwrap_or(8);
    let digits = n.unsigned_abs().clamp(1, 8) as usize;
    let full = if n < 0 {
        format!("{x:08X}")
    } else {
        format!("{x:08x}")
    };
    Ok(CallOutcome::one(&full[8 - digits..]))
}

fn bit_bnot(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    bit_result(!arg_bits(&args, 1, "bnot")?)
}

fn fold_bits(args: &MultiValue, name: &str, init: i32, op: fn(i32, i32) -> i32) -> LuaResult<CallOutcome> {
    let mut acc = if args.is_empty() {
        arg_bits(args, 1, name)?
    } else {
        init
    };
    for i in 1..=args.len() {
        acc = op(acc, arg_bits(args, i, name)?);
    }
    bit_result(acc)
}

fn bit_bor(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    fold_bits(&args, "bor", 0, |a, b| a | b)
}

/// Starts from all ones so a single operand passes through unchanged
fn bit_band(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    fold_bits(&args, "band", -1, |a, b| a & b)
}

fn bit_bxor(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    fold_bits(&args, "bxor", 0, |a, b| a ^ b)
}

fn shift_args(args: &MultiValue, name: &str) -> LuaResult<(i32, u32)> {
    let x = arg_bits(args, 1, name)?;
    let n = (arg_bits(args, 2, name)? & 31) as u32;
    Ok((x, n))
}

fn bit_lshift(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let (x, n) = shift_args(&args, "lshift")?;
    bit_result(((x as u32) << n) as i32)
}

/// Logical shift: zeros come in from the left
fn bit_rshift(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let (x, n) = shift_args(&args, "rshift")?;
    bit_result(((x as u32) >> n) as i32)
}

/// Arithmetic shift: the sign bit is replicated
fn bit_arshift(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let (x, n) = shift_args(&args, "arshift")?;
    bit_result(x >> n)
}

fn bit_rol(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let (x, n) = shift_args(&args, "rol")?;
    bit_result((x as u32).rotate_left(n) as i32)
}

fn bit_ror(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let (x, n) = shift_args(&args, "ror")?;
    bit_result((x as u32).rotate_right(n) as i32)
}

fn bit_bswap(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    bit_result(arg_bits(&args, 1, "bswap")?.swap_bytes())
}
