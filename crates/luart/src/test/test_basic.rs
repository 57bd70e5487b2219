// Tests for the base library and the multi-return protocol
use pretty_assertions::assert_eq;

use super::{SharedBuffer, call_lib, lib_fn, n, new_vm, s};
use crate::*;

fn failing(message: &'static str) -> LuaValue {
    LuaValue::closure("failing", move |_vm, _args| Err(LuaError::raise(message)))
}

fn returning_pair() -> LuaValue {
    LuaValue::closure("pair", |_vm, _args| {
        Ok(CallOutcome::values(MultiValue::two(n(1.0), n(2.0))))
    })
}

#[test]
fn test_pcall_results() {
    let mut vm = new_vm();
    let pcall = lib_fn(&vm, "_G", "pcall");

    let out = vm.call(&pcall, MultiValue::single(failing("boom"))).unwrap();
    assert_eq!(out.all_values(), vec![LuaValue::Boolean(false), s("boom")]);

    let out = vm.call(&pcall, MultiValue::single(returning_pair())).unwrap();
    assert_eq!(out.all_values(), vec![LuaValue::Boolean(true), n(1.0), n(2.0)]);

    let out = vm.pcall(&LuaValue::Nil, MultiValue::empty());
    assert_eq!(
        out.all_values(),
        vec![LuaValue::Boolean(false), s("attempt to call a nil value")]
    );
}

#[test]
fn test_error_preserves_raised_value() {
    let mut vm = new_vm();
    let error = lib_fn(&vm, "_G", "error");
    let payload = LuaValue::table(LuaTable::new());
    let out = vm.pcall(&error, MultiValue::single(payload.clone()));
    assert_eq!(out.all_values(), vec![LuaValue::Boolean(false), payload]);

    let err = vm.call(&error, MultiValue::single(s("plain"))).unwrap_err();
    assert!(matches!(err, LuaError::Runtime(_)));
    assert_eq!(err.to_string(), "plain");
}

#[test]
fn test_xpcall_passes_error_through_handler() {
    let mut vm = new_vm();
    let handler = LuaValue::closure("handler", |_vm, args| {
        Ok(CallOutcome::one(format!("handled: {}", args.arg(1).to_string_raw())))
    });
    let out = call_lib(&mut vm, "_G", "xpcall", vec![failing("bad"), handler.clone()]).unwrap();
    assert_eq!(out, vec![LuaValue::Boolean(false), s("handled: bad")]);

    let out = call_lib(&mut vm, "_G", "xpcall", vec![returning_pair(), handler]).unwrap();
    assert_eq!(out, vec![LuaValue::Boolean(true), n(1.0), n(2.0)]);
}

#[test]
fn test_select_and_unpack_substitute_results() {
    let mut vm = new_vm();
    let select = lib_fn(&vm, "_G", "select");
    let args = MultiValue::multiple(vec![s("#"), s("a"), s("b"), s("c")]);
    let outcome = vm.call_outcome(&select, args).unwrap();
    assert!(outcome.is_substituted());
    assert_eq!(outcome.into_values().all_values(), vec![n(3.0)]);

    let out = call_lib(&mut vm, "_G", "select", vec![n(2.0), s("a"), s("b"), s("c")]).unwrap();
    assert_eq!(out, vec![s("b"), s("c")]);
    let out = call_lib(&mut vm, "_G", "select", vec![n(-1.0), s("a"), s("b"), s("c")]).unwrap();
    assert_eq!(out, vec![s("c")]);
    let err = call_lib(&mut vm, "_G", "select", vec![n(0.0), s("a")]).unwrap_err();
    assert!(err.to_string().contains("index out of range"));

    let list = LuaValue::table(LuaTable::from_array(vec![n(1.0), n(2.0), n(3.0)]));
    let unpack = lib_fn(&vm, "_G", "unpack");
    let outcome = vm.call_outcome(&unpack, MultiValue::single(list.clone())).unwrap();
    assert!(outcome.is_substituted());
    assert_eq!(outcome.into_values().all_values(), vec![n(1.0), n(2.0), n(3.0)]);

    let out = call_lib(&mut vm, "_G", "unpack", vec![list.clone(), n(2.0), n(3.0)]).unwrap();
    assert_eq!(out, vec![n(2.0), n(3.0)]);
    let out = call_lib(&mut vm, "_G", "unpack", vec![list.clone(), n(3.0), n(2.0)]).unwrap();
    assert!(out.is_empty());

    // Far-apart bounds are refused rather than overflowing
    let err = call_lib(&mut vm, "_G", "unpack", vec![list.clone(), n(-9e18), n(9e18)]).unwrap_err();
    assert_eq!(err.to_string(), "too many results to unpack");
    let out = vm.pcall(&unpack, MultiValue::multiple(vec![list.clone(), n(-9e18), n(9e18)]));
    assert_eq!(
        out.all_values(),
        vec![LuaValue::Boolean(false), s("too many results to unpack")]
    );

    // A substituted sequence is an ordinary result for a protected call
    let out = vm.pcall(&unpack, MultiValue::single(list));
    assert_eq!(
        out.all_values(),
        vec![LuaValue::Boolean(true), n(1.0), n(2.0), n(3.0)]
    );
}

#[test]
fn test_type_tonumber_tostring() {
    let mut vm = new_vm();
    let type_of = |vm: &mut LuaVM, v: LuaValue| call_lib(vm, "_G", "type", vec![v]).unwrap()[0].clone();
    assert_eq!(type_of(&mut vm, LuaValue::Nil), s("nil"));
    assert_eq!(type_of(&mut vm, n(1.0)), s("number"));
    assert_eq!(type_of(&mut vm, s("x")), s("string"));
    assert_eq!(type_of(&mut vm, LuaValue::table(LuaTable::new())), s("table"));
    let print = lib_fn(&vm, "_G", "print");
    assert_eq!(type_of(&mut vm, print), s("function"));
    assert!(call_lib(&mut vm, "_G", "type", vec![]).is_err());

    let tonumber = |vm: &mut LuaVM, args: Vec<LuaValue>| call_lib(vm, "_G", "tonumber", args).unwrap()[0].clone();
    assert_eq!(tonumber(&mut vm, vec![s("0x10")]), n(16.0));
    assert_eq!(tonumber(&mut vm, vec![s(" 1.5e1 ")]), n(15.0));
    assert!(tonumber(&mut vm, vec![s("12a")]).is_nil());
    assert!(tonumber(&mut vm, vec![LuaValue::Boolean(true)]).is_nil());
    assert_eq!(tonumber(&mut vm, vec![s("ff"), n(16.0)]), n(255.0));
    assert_eq!(tonumber(&mut vm, vec![s("z"), n(36.0)]), n(35.0));
    assert!(tonumber(&mut vm, vec![s("8"), n(8.0)]).is_nil());
    assert!(call_lib(&mut vm, "_G", "tonumber", vec![s("1"), n(1.0)]).is_err());

    let out = call_lib(&mut vm, "_G", "tostring", vec![n(1.5)]).unwrap();
    assert_eq!(out, vec![s("1.5")]);
    let out = call_lib(&mut vm, "_G", "tostring", vec![LuaValue::Nil]).unwrap();
    assert_eq!(out, vec![s("nil")]);
}

#[test]
fn test_assert_returns_arguments_or_raises() {
    let mut vm = new_vm();
    let out = call_lib(&mut vm, "_G", "assert", vec![n(1.0), s("msg")]).unwrap();
    assert_eq!(out, vec![n(1.0), s("msg")]);
    let err = call_lib(&mut vm, "_G", "assert", vec![LuaValue::Boolean(false), s("msg")]).unwrap_err();
    assert_eq!(err.to_string(), "msg");
    let err = call_lib(&mut vm, "_G", "assert", vec![LuaValue::Nil]).unwrap_err();
    assert_eq!(err.to_string(), "assertion failed!");
}

#[test]
fn test_ipairs_stops_at_first_nil() {
    let mut vm = new_vm();
    let t = LuaTableRef::default();
    t.raw_set(n(1.0), s("a")).unwrap();
    t.raw_set(n(2.0), s("b")).unwrap();
    t.raw_set(n(4.0), s("d")).unwrap();
    let out = call_lib(&mut vm, "_G", "ipairs", vec![LuaValue::Table(t.clone())]).unwrap();
    let (iter, state, mut control) = (out[0].clone(), out[1].clone(), out[2].clone());

    let mut seen = Vec::new();
    loop {
        let step = vm.call(&iter, MultiValue::two(state.clone(), control)).unwrap();
        if step.first().is_nil() {
            break;
        }
        control = step.first();
        seen.push(step.arg(2));
    }
    assert_eq!(seen, vec![s("a"), s("b")]);
}

#[test]
fn test_pairs_and_next_visit_everything() {
    let mut vm = new_vm();
    let t = LuaTableRef::new(LuaTable::from_array(vec![n(10.0), n(20.0)]));
    t.set_str("x", s("y"));
    t.raw_set(LuaValue::Boolean(true), s("yes")).unwrap();

    let out = call_lib(&mut vm, "_G", "pairs", vec![LuaValue::Table(t.clone())]).unwrap();
    let iter = out[0].clone();
    let mut count = 0;
    while !vm.call1(&iter, MultiValue::empty()).unwrap().is_nil() {
        count += 1;
    }
    assert_eq!(count, 4);

    let mut key = LuaValue::Nil;
    let mut count = 0;
    loop {
        let step = call_lib(&mut vm, "_G", "next", vec![LuaValue::Table(t.clone()), key]).unwrap();
        if step[0].is_nil() {
            break;
        }
        key = step[0].clone();
        count += 1;
    }
    assert_eq!(count, 4);

    let empty = LuaValue::table(LuaTable::new());
    let out = call_lib(&mut vm, "_G", "next", vec![empty]).unwrap();
    assert_eq!(out, vec![LuaValue::Nil]);
}

#[test]
fn test_raw_access_bypasses_metamethods() {
    let mut vm = new_vm();
    let mt = LuaTableRef::default();
    let fallback = LuaTableRef::default();
    fallback.set_str("k", s("from index"));
    mt.set_str("__index", LuaValue::Table(fallback));
    mt.set_str(
        "__newindex",
        LuaValue::closure("deny", |_vm, _args| Err(LuaError::raise("read only"))),
    );
    let t = LuaTableRef::default();
    t.set_metatable(Some(mt));
    let t = LuaValue::Table(t);

    assert_eq!(vm.table_get(&t, &s("k")).unwrap(), s("from index"));
    let out = call_lib(&mut vm, "_G", "rawget", vec![t.clone(), s("k")]).unwrap();
    assert_eq!(out, vec![LuaValue::Nil]);

    assert!(vm.table_set(&t, s("n"), n(1.0)).is_err());
    call_lib(&mut vm, "_G", "rawset", vec![t.clone(), s("n"), n(1.0)]).unwrap();
    assert_eq!(vm.table_get(&t, &s("n")).unwrap(), n(1.0));

    let other = LuaValue::table(LuaTable::new());
    let out = call_lib(&mut vm, "_G", "rawequal", vec![t.clone(), other]).unwrap();
    assert_eq!(out, vec![LuaValue::Boolean(false)]);
    let out = call_lib(&mut vm, "_G", "rawequal", vec![t.clone(), t]).unwrap();
    assert_eq!(out, vec![LuaValue::Boolean(true)]);
}

#[test]
fn test_print_writes_to_output_sink() {
    let mut vm = new_vm();
    let buffer = SharedBuffer::default();
    vm.set_output(Box::new(buffer.clone()));
    call_lib(&mut vm, "_G", "print", vec![s("a"), n(1.0), LuaValue::Nil]).unwrap();
    call_lib(&mut vm, "_G", "print", vec![]).unwrap();
    assert_eq!(buffer.text(), "a\t1\tnil\n\n");
}

#[test]
fn test_load_needs_a_chunk_loader() {
    let mut vm = new_vm();
    let err = call_lib(&mut vm, "_G", "load", vec![s("return 1")]).unwrap_err();
    assert!(matches!(err, LuaError::Unsupported(_)));

    vm.set_chunk_loader(|_vm, source| {
        if source.is_empty() {
            return Err(LuaError::raise("empty chunk"));
        }
        let text = source.to_string();
        Ok(LuaValue::closure("chunk", move |_vm, _args| {
            Ok(CallOutcome::one(text.clone()))
        }))
    });
    let out = call_lib(&mut vm, "_G", "loadstring", vec![s("body")]).unwrap();
    assert_eq!(vm.call1(&out[0], MultiValue::empty()).unwrap(), s("body"));
    let out = call_lib(&mut vm, "_G", "load", vec![s("")]).unwrap();
    assert_eq!(out, vec![LuaValue::Nil, s("empty chunk")]);
}

#[test]
fn test_stubbed_base_functions() {
    let mut vm = new_vm();
    for name in ["loadfile", "dofile", "getfenv", "setfenv"] {
        let err = call_lib(&mut vm, "_G", name, vec![]).unwrap_err();
        assert!(matches!(err, LuaError::Unsupported(_)), "{name}");
    }
    assert_eq!(call_lib(&mut vm, "_G", "collectgarbage", vec![]).unwrap(), vec![n(0.0)]);
    assert_eq!(vm.get_global("_VERSION"), s("Lua 5.1"));
    let g = vm.get_global("_G");
    assert!(g.as_table().unwrap().ptr_eq(&vm.globals()));
}

#[test]
fn test_runtimes_are_independent() {
    let mut a = new_vm();
    let b = new_vm();
    a.set_global("shared", n(1.0));
    assert!(b.get_global("shared").is_nil());
}
