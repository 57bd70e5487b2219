// Tests for the math and bit libraries
use pretty_assertions::assert_eq;

use super::{call_lib, n, new_vm, s};
use crate::*;

fn math(vm: &mut LuaVM, name: &str, args: Vec<f64>) -> Vec<LuaValue> {
    call_lib(vm, "math", name, args.into_iter().map(LuaValue::Number).collect()).unwrap()
}

fn bit(vm: &mut LuaVM, name: &str, args: Vec<f64>) -> LuaValue {
    call_lib(vm, "bit", name, args.into_iter().map(LuaValue::Number).collect()).unwrap()[0].clone()
}

#[test]
fn test_math_basics() {
    let mut vm = new_vm();
    assert_eq!(math(&mut vm, "abs", vec![-3.0]), vec![n(3.0)]);
    assert_eq!(math(&mut vm, "floor", vec![-3.5]), vec![n(-4.0)]);
    assert_eq!(math(&mut vm, "ceil", vec![3.2]), vec![n(4.0)]);
    assert_eq!(math(&mut vm, "sqrt", vec![16.0]), vec![n(4.0)]);
    assert_eq!(math(&mut vm, "max", vec![1.0, 5.0, 3.0]), vec![n(5.0)]);
    assert_eq!(math(&mut vm, "min", vec![4.0, -2.0, 3.0]), vec![n(-2.0)]);
    assert_eq!(math(&mut vm, "fmod", vec![-7.0, 3.0]), vec![n(-1.0)]);
    assert_eq!(math(&mut vm, "modf", vec![3.75]), vec![n(3.0), n(0.75)]);
    assert_eq!(math(&mut vm, "modf", vec![-3.75]), vec![n(-3.0), n(-0.75)]);
    assert_eq!(math(&mut vm, "pow", vec![2.0, 8.0]), vec![n(256.0)]);
    let deg = math(&mut vm, "deg", vec![std::f64::consts::PI])[0].as_number().unwrap();
    assert!((deg - 180.0).abs() < 1e-12);
    assert_eq!(math(&mut vm, "log", vec![8.0, 2.0]), vec![n(3.0)]);
    let log = math(&mut vm, "log10", vec![1000.0])[0].as_number().unwrap();
    assert!((log - 3.0).abs() < 1e-12);
    assert_eq!(math(&mut vm, "exp", vec![0.0]), vec![n(1.0)]);
    assert_eq!(math(&mut vm, "atan2", vec![0.0, 1.0]), vec![n(0.0)]);
}

#[test]
fn test_math_frexp_ldexp() {
    let mut vm = new_vm();
    assert_eq!(math(&mut vm, "frexp", vec![8.0]), vec![n(0.5), n(4.0)]);
    assert_eq!(math(&mut vm, "frexp", vec![-3.0]), vec![n(-0.75), n(2.0)]);
    assert_eq!(math(&mut vm, "frexp", vec![0.0]), vec![n(0.0), n(0.0)]);
    assert_eq!(math(&mut vm, "ldexp", vec![0.5, 4.0]), vec![n(8.0)]);
}

#[test]
fn test_math_constants() {
    let vm = new_vm();
    let math = vm.get_global("math");
    let math = math.as_table().unwrap();
    assert_eq!(math.get_str("pi"), n(std::f64::consts::PI));
    assert_eq!(math.get_str("huge"), n(f64::INFINITY));
}

#[test]
fn test_math_argument_errors() {
    let mut vm = new_vm();
    let err = call_lib(&mut vm, "math", "abs", vec![s("x")]).unwrap_err();
    assert_eq!(err.to_string(), "bad argument #1 to 'abs' (number expected, got string)");
    let err = call_lib(&mut vm, "math", "floor", vec![]).unwrap_err();
    assert_eq!(err.to_string(), "bad argument #1 to 'floor' (number expected, got no value)");
    // Numeric strings are accepted
    assert_eq!(call_lib(&mut vm, "math", "abs", vec![s("-2")]).unwrap(), vec![n(2.0)]);
}

#[test]
fn test_math_random_ranges() {
    let mut vm = new_vm();
    for _ in 0..50 {
        let x = math(&mut vm, "random", vec![])[0].as_number().unwrap();
        assert!((0.0..1.0).contains(&x));
        let y = math(&mut vm, "random", vec![6.0])[0].as_number().unwrap();
        assert!((1.0..=6.0).contains(&y) && y.fract() == 0.0);
        let z = math(&mut vm, "random", vec![-3.0, 3.0])[0].as_number().unwrap();
        assert!((-3.0..=3.0).contains(&z));
    }
    let err = call_lib(&mut vm, "math", "random", vec![n(5.0), n(1.0)]).unwrap_err();
    assert!(err.to_string().contains("interval is empty"));
}

#[test]
fn test_math_random_is_reproducible() {
    let mut a = new_vm();
    let mut b = new_vm();
    let xs: Vec<LuaValue> = (0..5).map(|_| math(&mut a, "random", vec![100.0])[0].clone()).collect();
    let ys: Vec<LuaValue> = (0..5).map(|_| math(&mut b, "random", vec![100.0])[0].clone()).collect();
    assert_eq!(xs, ys);

    math(&mut a, "randomseed", vec![7.0]);
    math(&mut b, "randomseed", vec![7.0]);
    assert_eq!(math(&mut a, "random", vec![]), math(&mut b, "random", vec![]));
}

#[test]
fn test_bit_operations() {
    let mut vm = new_vm();
    assert_eq!(bit(&mut vm, "tobit", vec![4294967295.0]), n(-1.0));
    assert_eq!(bit(&mut vm, "tobit", vec![4294967296.0 + 5.0]), n(5.0));
    assert_eq!(bit(&mut vm, "bnot", vec![0.0]), n(-1.0));
    assert_eq!(bit(&mut vm, "bor", vec![1.0, 2.0, 4.0]), n(7.0));
    assert_eq!(bit(&mut vm, "band", vec![7.0, 3.0]), n(3.0));
    assert_eq!(bit(&mut vm, "band", vec![12.0]), n(12.0));
    assert_eq!(bit(&mut vm, "bxor", vec![5.0, 3.0]), n(6.0));
    assert_eq!(bit(&mut vm, "lshift", vec![1.0, 4.0]), n(16.0));
    assert_eq!(bit(&mut vm, "lshift", vec![1.0, 36.0]), n(16.0));
    assert_eq!(bit(&mut vm, "rshift", vec![-1.0, 28.0]), n(15.0));
    assert_eq!(bit(&mut vm, "arshift", vec![-256.0, 4.0]), n(-16.0));
    assert_eq!(bit(&mut vm, "rol", vec![0x12345678 as f64, 8.0]), n(0x34567812 as f64));
    assert_eq!(bit(&mut vm, "ror", vec![0x12345678 as f64, 8.0]), n(0x78123456 as f64));
    assert_eq!(bit(&mut vm, "bswap", vec![0x12345678 as f64]), n(0x78563412 as f64));
}

#[test]
fn test_bit_tohex() {
    let mut vm = new_vm();
    assert_eq!(bit(&mut vm, "tohex", vec![255.0]), s("000000ff"));
    assert_eq!(bit(&mut vm, "tohex", vec![255.0, -4.0]), s("00FF"));
    assert_eq!(bit(&mut vm, "tohex", vec![-1.0, 2.0]), s("ff"));
    assert!(call_lib(&mut vm, "bit", "bor", vec![]).is_err());
}
