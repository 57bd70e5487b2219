// Tests for metatable driven dispatch
use pretty_assertions::assert_eq;

use super::{call_lib, lib_fn, n, new_vm, s};
use crate::*;

/// Table with a fresh metatable; returns (table, metatable)
fn with_metatable() -> (LuaValue, LuaTableRef) {
    let mt = LuaTableRef::default();
    let t = LuaTableRef::default();
    t.set_metatable(Some(mt.clone()));
    (LuaValue::Table(t), mt)
}

fn constant(name: &str, value: bool) -> LuaValue {
    LuaValue::closure(name, move |_vm, _args| Ok(CallOutcome::one(value)))
}

#[test]
fn test_index_function_and_chain() {
    let mut vm = new_vm();
    let (t, mt) = with_metatable();
    mt.set_str(
        "__index",
        LuaValue::closure("index", |_vm, args| {
            let key = args.arg(2).to_string_raw();
            Ok(CallOutcome::one(format!("default:{key}")))
        }),
    );
    assert_eq!(vm.table_get(&t, &s("x")).unwrap(), s("default:x"));
    t.as_table().unwrap().set_str("x", n(1.0));
    assert_eq!(vm.table_get(&t, &s("x")).unwrap(), n(1.0));

    // Table handlers are walked in turn
    let base = LuaTableRef::default();
    base.set_str("greeting", s("hi"));
    let (child, child_mt) = with_metatable();
    child_mt.set_str("__index", LuaValue::Table(base));
    assert_eq!(vm.table_get(&child, &s("greeting")).unwrap(), s("hi"));
    assert!(vm.table_get(&child, &s("other")).unwrap().is_nil());
}

#[test]
fn test_index_loop_is_reported() {
    let mut vm = new_vm();
    let (t, mt) = with_metatable();
    mt.set_str("__index", t.clone());
    let err = vm.table_get(&t, &s("x")).unwrap_err();
    assert!(err.to_string().contains("'__index' chain too long"));
}

#[test]
fn test_newindex_function_and_table() {
    let mut vm = new_vm();
    let log = LuaTableRef::default();
    let (t, mt) = with_metatable();
    let sink = log.clone();
    mt.set_str(
        "__newindex",
        LuaValue::closure("newindex", move |_vm, args| {
            sink.raw_set(args.arg(2), args.arg(3))?;
            Ok(CallOutcome::none())
        }),
    );
    vm.table_set(&t, s("k"), n(5.0)).unwrap();
    assert!(t.as_table().unwrap().get_str("k").is_nil());
    assert_eq!(log.get_str("k"), n(5.0));

    let store = LuaTableRef::default();
    let (proxy, proxy_mt) = with_metatable();
    proxy_mt.set_str("__newindex", LuaValue::Table(store.clone()));
    vm.table_set(&proxy, s("a"), s("b")).unwrap();
    assert_eq!(store.get_str("a"), s("b"));
}

#[test]
fn test_newindex_never_sees_invalid_keys() {
    let mut vm = new_vm();
    let (t, mt) = with_metatable();
    let seen = LuaTableRef::default();
    let sink = seen.clone();
    mt.set_str(
        "__newindex",
        LuaValue::closure("newindex", move |_vm, _args| {
            sink.set_str("called", LuaValue::Boolean(true));
            Ok(CallOutcome::none())
        }),
    );
    let err = vm.table_set(&t, LuaValue::Nil, n(1.0)).unwrap_err();
    assert!(matches!(err, LuaError::Key(_)));
    assert_eq!(err.to_string(), "table index is nil");
    let err = vm.table_set(&t, n(f64::NAN), n(1.0)).unwrap_err();
    assert_eq!(err.to_string(), "table index is NaN");
    assert!(seen.get_str("called").is_nil());

    // Handler tables further down the chain check the key the same way
    let (proxy, proxy_mt) = with_metatable();
    proxy_mt.set_str("__newindex", LuaValue::Table(LuaTableRef::default()));
    assert!(matches!(
        vm.table_set(&proxy, LuaValue::Nil, n(1.0)),
        Err(LuaError::Key(_))
    ));
}

#[test]
fn test_indexing_nil_names_the_key() {
    let mut vm = new_vm();
    let err = vm.table_get(&LuaValue::Nil, &s("x")).unwrap_err();
    assert!(matches!(err, LuaError::Key(_)));
    assert_eq!(err.to_string(), "attempt to index a nil value (key 'x')");

    let err = vm.table_get(&n(1.0), &s("x")).unwrap_err();
    assert!(matches!(err, LuaError::Type(_)));
}

#[test]
fn test_arithmetic_metamethods_left_then_right() {
    let mut vm = new_vm();
    let (t, mt) = with_metatable();
    mt.set_str(
        "__add",
        LuaValue::closure("add", |_vm, args| {
            let side = if args.arg(1).is_table() { "left" } else { "right" };
            Ok(CallOutcome::one(side))
        }),
    );
    assert_eq!(vm.add(&t, &n(1.0)).unwrap(), s("left"));
    assert_eq!(vm.add(&n(1.0), &t).unwrap(), s("right"));
    assert!(vm.sub(&t, &n(1.0)).is_err());

    mt.set_str(
        "__unm",
        LuaValue::closure("unm", |_vm, _args| Ok(CallOutcome::one(-1))),
    );
    assert_eq!(vm.unm(&t).unwrap(), n(-1.0));
}

#[test]
fn test_eq_requires_the_same_handler() {
    let mut vm = new_vm();
    let (a, mt_a) = with_metatable();
    let (b, mt_b) = with_metatable();

    let shared = constant("eq", true);
    mt_a.set_str("__eq", shared.clone());
    mt_b.set_str("__eq", shared);
    assert!(vm.equals(&a, &b).unwrap());

    // Different handlers: identity decides
    mt_b.set_str("__eq", constant("eq_other", true));
    assert!(!vm.equals(&a, &b).unwrap());
    assert!(vm.equals(&a, &a).unwrap());

    // Only tables escalate
    assert!(!vm.equals(&a, &n(1.0)).unwrap());
}

#[test]
fn test_lt_and_derived_le() {
    let mut vm = new_vm();
    let (a, mt_a) = with_metatable();
    let (b, mt_b) = with_metatable();
    let lt = LuaValue::closure("lt", |_vm, args| {
        let x = args.arg(1).as_table().map(|t| t.get_str("v")).unwrap_or_default();
        let y = args.arg(2).as_table().map(|t| t.get_str("v")).unwrap_or_default();
        Ok(CallOutcome::one(x.as_number() < y.as_number()))
    });
    a.as_table().unwrap().set_str("v", n(1.0));
    b.as_table().unwrap().set_str("v", n(2.0));
    mt_a.set_str("__lt", lt.clone());
    mt_b.set_str("__lt", lt);

    assert!(vm.less_than(&a, &b).unwrap());
    assert!(!vm.less_than(&b, &a).unwrap());
    // No __le: derived as not (b < a)
    assert!(vm.less_equal(&a, &b).unwrap());
    assert!(!vm.less_equal(&b, &a).unwrap());

    mt_b.set_str("__lt", constant("lt_other", true));
    assert!(matches!(vm.less_than(&a, &b), Err(LuaError::Compare(_))));
    assert!(matches!(vm.less_equal(&a, &b), Err(LuaError::Compare(_))));
}

#[test]
fn test_call_metamethod_prepends_callee() {
    let mut vm = new_vm();
    let (t, mt) = with_metatable();
    mt.set_str(
        "__call",
        LuaValue::closure("call", |_vm, args| {
            Ok(CallOutcome::values(MultiValue::two(
                LuaValue::from(args.len()),
                LuaValue::Boolean(args.arg(1).is_table()),
            )))
        }),
    );
    let result = vm.call(&t, MultiValue::single(n(9.0))).unwrap();
    assert_eq!(result.all_values(), vec![n(2.0), LuaValue::Boolean(true)]);

    let err = vm.call(&n(1.0), MultiValue::empty()).unwrap_err();
    assert_eq!(err.to_string(), "attempt to call a number value");
}

#[test]
fn test_method_calls() {
    let mut vm = new_vm();
    let obj = LuaTableRef::default();
    obj.set_str("name", s("box"));
    obj.set_str(
        "describe",
        LuaValue::closure("describe", |vm, args| {
            let name = vm.table_get(&args.arg(1), &s("name"))?;
            let suffix = args.arg(2).to_string_raw();
            Ok(CallOutcome::one(format!("{}{}", name.to_string_raw(), suffix)))
        }),
    );
    let obj = LuaValue::Table(obj);
    let out = vm.mcall(&obj, "describe", MultiValue::single(s("!"))).unwrap();
    assert_eq!(out.first(), s("box!"));

    let err = vm.mcall(&obj, "missing", MultiValue::empty()).unwrap_err();
    assert!(matches!(err, LuaError::Lookup(_)));
    assert_eq!(err.to_string(), "attempt to call method 'missing' (a nil value)");

    // Strings index the string library
    let upper = vm.mcall(&s("abc"), "upper", MultiValue::empty()).unwrap();
    assert_eq!(upper.first(), s("ABC"));
}

#[test]
fn test_len_concat_and_tostring_metamethods() {
    let mut vm = new_vm();
    let (t, mt) = with_metatable();
    mt.set_str("__len", LuaValue::closure("len", |_vm, _args| Ok(CallOutcome::one(42))));
    mt.set_str(
        "__concat",
        LuaValue::closure("concat", |_vm, _args| Ok(CallOutcome::one("joined"))),
    );
    mt.set_str(
        "__tostring",
        LuaValue::closure("tostring", |_vm, _args| Ok(CallOutcome::one("<obj>"))),
    );
    assert_eq!(vm.len(&t).unwrap(), n(42.0));
    assert_eq!(vm.concat(&s("x"), &t).unwrap(), s("joined"));
    assert_eq!(vm.tostring(&t).unwrap(), s("<obj>"));
    assert_eq!(call_lib(&mut vm, "_G", "tostring", vec![t]).unwrap(), vec![s("<obj>")]);
}

#[test]
fn test_protected_metatables() {
    let mut vm = new_vm();
    let (t, mt) = with_metatable();
    mt.set_str("__metatable", s("locked"));
    assert_eq!(call_lib(&mut vm, "_G", "getmetatable", vec![t.clone()]).unwrap(), vec![s("locked")]);
    let err = call_lib(&mut vm, "_G", "setmetatable", vec![t, LuaValue::Nil]).unwrap_err();
    assert_eq!(err.to_string(), "cannot change a protected metatable");

    let plain = LuaValue::table(LuaTable::new());
    let fresh = LuaValue::table(LuaTable::new());
    let out = call_lib(&mut vm, "_G", "setmetatable", vec![plain.clone(), fresh.clone()]).unwrap();
    assert_eq!(out, vec![plain.clone()]);
    assert_eq!(call_lib(&mut vm, "_G", "getmetatable", vec![plain]).unwrap(), vec![fresh]);
}

#[test]
fn test_call_depth_limit() {
    let mut vm = LuaVM::new(SafeOption {
        max_call_depth: 10,
        ..SafeOption::default()
    });
    vm.open_stdlib(Stdlib::All).unwrap();
    let recurse = LuaValue::closure("recurse", |vm, _args| {
        let me = vm.get_global("recurse");
        vm.call_outcome(&me, MultiValue::empty())
    });
    vm.set_global("recurse", recurse.clone());
    let err = vm.call(&recurse, MultiValue::empty()).unwrap_err();
    assert!(matches!(err, LuaError::StackOverflow));
    // The depth counter unwinds with the error
    let type_fn = lib_fn(&vm, "_G", "type");
    assert!(vm.call(&type_fn, MultiValue::single(n(1.0))).is_ok());
}
