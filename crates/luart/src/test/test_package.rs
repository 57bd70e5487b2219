// Tests for modules: create_module, require, module and package.seeall
use std::cell::Cell;
use std::rc::Rc;

use pretty_assertions::assert_eq;

use super::{call_lib, lib_fn, n, new_vm, s};
use crate::*;

#[test]
fn test_create_module_fields() {
    let mut vm = new_vm();
    let module = vm.create_module("game.util.vec", &[]).unwrap();
    assert_eq!(module.get_str("_NAME"), s("game.util.vec"));
    assert_eq!(module.get_str("_PACKAGE"), s("game.util."));
    assert_eq!(module.get_str("_M"), LuaValue::Table(module.clone()));

    // Linked along the dotted global path
    let game = vm.get_global("game");
    let util = game.as_table().unwrap().get_str("util");
    let linked = util.as_table().unwrap().get_str("vec");
    assert_eq!(linked, LuaValue::Table(module.clone()));

    // Registered in package.loaded
    let loaded = lib_fn(&vm, "package", "loaded");
    assert_eq!(loaded.as_table().unwrap().get_str("game.util.vec"), LuaValue::Table(module));
}

#[test]
fn test_create_module_runs_initializers_and_reopens() {
    let mut vm = new_vm();
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let init = LuaValue::closure("init", move |_vm, args| {
        counter.set(counter.get() + 1);
        if let LuaValue::Table(module) = args.first() {
            module.set_str("answer", LuaValue::Number(42.0));
        }
        Ok(CallOutcome::none())
    });

    let first = vm.create_module("config", &[init.clone()]).unwrap();
    let again = vm.create_module("config", &[init]).unwrap();
    assert!(first.ptr_eq(&again));
    assert_eq!(calls.get(), 2);
    assert_eq!(first.get_str("answer"), n(42.0));
    assert_eq!(first.get_str("_PACKAGE"), s(""));
}

#[test]
fn test_create_module_name_conflict() {
    let mut vm = new_vm();
    vm.set_global("taken", n(1.0));
    let err = vm.create_module("taken.inner", &[]).unwrap_err();
    assert_eq!(err.to_string(), "name conflict for module 'taken.inner'");
}

#[test]
fn test_require_registered_and_missing() {
    let mut vm = new_vm();
    let module = vm.create_module("shapes", &[]).unwrap();
    assert_eq!(vm.require("shapes").unwrap(), LuaValue::Table(module.clone()));
    assert_eq!(
        call_lib(&mut vm, "_G", "require", vec![s("shapes")]).unwrap(),
        vec![LuaValue::Table(module)]
    );

    let err = vm.require("nowhere").unwrap_err();
    assert!(matches!(err, LuaError::Lookup(_)));
    assert_eq!(err.to_string(), "module 'nowhere' not found");

    // Builtin libraries are visible through package.loaded
    let string_lib = vm.get_global("string");
    assert_eq!(vm.require("string").unwrap(), string_lib);
}

#[test]
fn test_require_runs_preload_once() {
    let mut vm = new_vm();
    let runs = Rc::new(Cell::new(0));
    let counter = runs.clone();
    let loader = LuaValue::closure("loader", move |vm, args| {
        counter.set(counter.get() + 1);
        assert_eq!(args.first(), LuaValue::from("lazy"));
        let module = vm.new_table();
        module.as_table().unwrap().set_str("ready", LuaValue::Boolean(true));
        Ok(CallOutcome::one(module))
    });
    let preload = lib_fn(&vm, "package", "preload");
    preload.as_table().unwrap().set_str("lazy", loader);

    let first = vm.require("lazy").unwrap();
    let second = vm.require("lazy").unwrap();
    assert_eq!(first, second);
    assert_eq!(runs.get(), 1);
    assert_eq!(first.as_table().unwrap().get_str("ready"), LuaValue::Boolean(true));
    assert_eq!(vm.get_global("lazy"), first);
}

#[test]
fn test_require_preload_without_result() {
    let mut vm = new_vm();
    let loader = LuaValue::closure("loader", |_vm, _args| Ok(CallOutcome::none()));
    let preload = lib_fn(&vm, "package", "preload");
    preload.as_table().unwrap().set_str("sideeffect", loader);
    assert_eq!(vm.require("sideeffect").unwrap(), LuaValue::Boolean(true));
}

#[test]
fn test_module_with_seeall() {
    let mut vm = new_vm();
    let seeall = lib_fn(&vm, "package", "seeall");
    let module = call_lib(&mut vm, "_G", "module", vec![s("mymod"), seeall]).unwrap();
    let module = module[0].clone();
    assert_eq!(vm.get_global("mymod"), module);

    // Global lookups fall through the module
    let print = vm.get_global("print");
    assert_eq!(vm.table_get(&module, &s("print")).unwrap(), print);
    // but raw access does not see them
    assert_eq!(module.as_table().unwrap().get_str("print"), LuaValue::Nil);
}

#[test]
fn test_package_defaults() {
    let mut vm = new_vm();
    assert_eq!(lib_fn(&vm, "package", "path"), s("./?.lua"));
    assert_eq!(lib_fn(&vm, "package", "cpath"), s(""));
    let err = call_lib(&mut vm, "package", "loadlib", vec![s("lib.so"), s("init")]).unwrap_err();
    assert!(matches!(err, LuaError::Unsupported(_)));
}
