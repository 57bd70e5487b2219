// Math library
// Implements: abs, acos, asin, atan, atan2, ceil, cos, cosh, deg, exp,
// floor, fmod, frexp, ldexp, log, log10, max, min, modf, pow, rad, random,
// randomseed, sin, sinh, sqrt, tan, tanh, pi, huge

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::lib_registry::{LibraryModule, check_integer, check_number, opt_integer, opt_number};
use crate::lua_value::{CallOutcome, LuaValue, MultiValue};
use crate::lua_vm::{LuaError, LuaResult, LuaVM};

pub fn create_math_lib() -> LibraryModule {
    crate::lib_module!("math", {
        "abs" => math_abs,
        "acos" => math_acos,
        "asin" => math_asin,
        "atan" => math_atan,
        "atan2" => math_atan2,
        "ceil" => math_ceil,
        "cos" => math_cos,
        "cosh" => math_cosh,
        "deg" => math_deg,
        "exp" => math_exp,
        "floor" => math_floor,
        "fmod" => math_fmod,
        "frexp" => math_frexp,
        "ldexp" => math_ldexp,
        "log" => math_log,
        "log10" => math_log10,
        "max" => math_max,
        "min" => math_min,
        "modf" => math_modf,
        "pow" => math_pow,
        "rad" => math_rad,
        "random" => math_random,
        "randomseed" => math_randomseed,
        "sin" => math_sin,
        "sinh" => math_sinh,
        "sqrt" => math_sqrt,
        "tan" => math_tan,
        "tanh" => math_tanh,
    })
    .with_value("pi", |_| LuaValue::Number(std::f64::consts::PI))
    .with_value("huge", |_| LuaValue::Number(f64::INFINITY))
}

fn unary(args: &MultiValue, name: &str, f: fn(f64) -> f64) -> LuaResult<CallOutcome> {
    let x = check_number(args, 1, name)?;
    Ok(CallOutcome::one(f(x)))
}

fn math_abs(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    unary(&args, "abs", f64::abs)
}

fn math_acos(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    unary(&args, "acos", f64::acos)
}

fn math_asin(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    unary(&args, "asin", f64::asin)
}

fn math_atan(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    unary(&args, "atan", f64::atan)
}

fn math_atan2(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let y = check_number(&args, 1, "atan2")?;
    let x = check_number(&args, 2, "atan2")?;
    Ok(CallOutcome::one(y.atan2(x)))
}

fn math_ceil(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    unary(&args, "ceil", f64::ceil)
}

fn math_cos(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    unary(&args, "cos", f64::cos)
}

fn math_cosh(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    unary(&args, "cosh", f64::cosh)
}

/// Radians to degrees
fn math_deg(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    unary(&args, "deg", f64::to_degrees)
}

fn math_exp(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    unary(&args, "exp", f64::exp)
}

fn math_floor(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    unary(&args, "floor", f64::floor)
}

/// C fmod: remainder with the sign of the dividend
fn math_fmod(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let a = check_number(&args, 1, "fmod")?;
    let b = check_number(&args, 2, "fmod")?;
    Ok(CallOutcome::one(a % b))
}

/// Split into mantissa in [0.5, 1) and power of two
pub(crate) fn frexp(x: f64) -> (f64, i32) {
    if x == 0.0 || !x.is_finite() {
        return (x, 0);
    }
    let bits = x.to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i32;
    if biased == 0 {
        // Subnormal: scale into the normal range first
        let (m, e) = frexp(x * 2f64.powi(54));
        return (m, e - 54);
    }
    let mantissa = f64::from_bits((bits & !(0x7ffu64 << 52)) | (1022u64 << 52));
    (mantissa, biased - 1022)
}

fn math_frexp(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let (m, e) = frexp(check_number(&args, 1, "frexp")?);
    Ok(CallOutcome::values(MultiValue::two(
        LuaValue::Number(m),
        LuaValue::from(e),
    )))
}

fn math_ldexp(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let m = check_number(&args, 1, "ldexp")?;
    let e = check_integer(&args, 2, "ldexp")?;
    let e = e.clamp(-2200, 2200) as i32;
    Ok(CallOutcome::one(m * 2f64.powi(e)))
}

/// log(x [, base])
fn math_log(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let x = check_number(&args, 1, "log")?;
    let result = match opt_number(&args, 2, "log")? {
        None => x.ln(),
        Some(base) if base == 2.0 => x.log2(),
        Some(base) if base == 10.0 => x.log10(),
        Some(base) => x.ln() / base.ln(),
    };
    Ok(CallOutcome::one(result))
}

fn math_log10(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    unary(&args, "log10", f64::log10)
}

fn fold_numbers(args: &MultiValue, name: &str, pick: fn(f64, f64) -> bool) -> LuaResult<f64> {
    let mut best = check_number(args, 1, name)?;
    for i in 2..=args.len() {
        let x = check_number(args, i, name)?;
        if pick(x, best) {
            best = x;
        }
    }
    Ok(best)
}

fn math_max(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    Ok(CallOutcome::one(fold_numbers(&args, "max", |x, best| x > best)?))
}

fn math_min(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    Ok(CallOutcome::one(fold_numbers(&args, "min", |x, best| x < best)?))
}

/// Integral and fractional parts, both carrying the sign of x
fn math_modf(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let x = check_number(&args, 1, "modf")?;
    let int_part = x.trunc();
    let frac = if x.is_infinite() { 0.0 } else { x - int_part };
    Ok(CallOutcome::values(MultiValue::two(
        LuaValue::Number(int_part),
        LuaValue::Number(frac),
    )))
}

fn math_pow(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let x = check_number(&args, 1, "pow")?;
    let y = check_number(&args, 2, "pow")?;
    Ok(CallOutcome::one(x.powf(y)))
}

/// Degrees to radians
fn math_rad(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    unary(&args, "rad", f64::to_radians)
}

/// random() in [0,1), random(m) in [1,m], random(m,n) in [m,n]
fn math_random(vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let (low, high) = match (opt_integer(&args, 1, "random")?, opt_integer(&args, 2, "random")?) {
        (None, None) => return Ok(CallOutcome::one(vm.rng.r#gen::<f64>())),
        (Some(m), None) => (1, m),
        (Some(m), Some(n)) => (m, n),
        (None, Some(_)) => {
            return Err(LuaError::Type(
                "bad argument #1 to 'random' (number expected, got nil)".to_string(),
            ));
        }
    };
    if low > high {
        return Err(LuaError::Type(
            "bad argument to 'random' (interval is empty)".to_string(),
        ));
    }
    Ok(CallOutcome::one(vm.rng.gen_range(low..=high)))
}

fn math_randomseed(vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let seed = check_number(&args, 1, "randomseed")?;
    vm.rng = StdRng::seed_from_u64(seed.to_bits());
    Ok(CallOutcome::none())
}

fn math_sin(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    unary(&args, "sin", f64::sin)
}

fn math_sinh(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    unary(&args, "sinh", f64::sinh)
}

fn math_sqrt(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    unary(&args, "sqrt", f64::sqrt)
}

fn math_tan(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    unary(&args, "tan", f64::tan)
}

fn math_tanh(_vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    unary(&args, "tanh", f64::tanh)
}
