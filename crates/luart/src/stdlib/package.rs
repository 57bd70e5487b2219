// Package library and module registry
// Implements: package.loaded, package.preload, package.path, package.cpath,
// package.seeall, package.loadlib (unsupported), module, require
use smol_str::SmolStr;
use tracing::debug;

use crate::lib_registry::{LibraryModule, check_string, check_table};
use crate::lua_value::{CallOutcome, LuaTableRef, LuaValue, MultiValue};
use crate::lua_vm::{LuaError, LuaResult, LuaVM};

pub fn create_package_lib() -> LibraryModule {
    crate::lib_module!("package", {
        "seeall" => package_seeall,
        "loadlib" => package_loadlib,
    })
    .with_value("loaded", |_| LuaValue::Table(LuaTableRef::default()))
    .with_value("preload", |_| LuaValue::Table(LuaTableRef::default()))
    .with_value("path", |_| LuaValue::from("./?.lua"))
    .with_value("cpath", |_| LuaValue::from(""))
}

/// `package.<field>` when it is a table
fn package_table(vm: &LuaVM, field: &str) -> Option<LuaTableRef> {
    match vm.get_global("package") {
        LuaValue::Table(package) => match package.get_str(field) {
            LuaValue::Table(t) => Some(t),
            _ => None,
        },
        _ => None,
    }
}

/// `a.b.c` -> `a.b.`; empty for a top level name
fn package_prefix(name: &str) -> &str {
    match name.rfind('.') {
        Some(pos) => &name[..=pos],
        None => "",
    }
}

/// Store `module` at the dotted path `name` under the globals, creating
/// intermediate tables as needed
fn link_global_path(vm: &LuaVM, name: &str, module: &LuaTableRef) -> LuaResult<()> {
    let mut parent = vm.globals();
    let mut parts = name.split('.').peekable();
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            parent.set_str(part, LuaValue::Table(module.clone()));
            break;
        }
        let next = match parent.get_str(part) {
            LuaValue::Table(t) => t,
            LuaValue::Nil => {
                let t = LuaTableRef::default();
                parent.set_str(part, LuaValue::Table(t.clone()));
                t
            }
            _ => {
                return Err(LuaError::Type(format!(
                    "name conflict for module '{name}'"
                )));
            }
        };
        parent = next;
    }
    Ok(())
}

/// Create (or reopen) the module `name`.
///
/// Seeds `_NAME`, `_M` and `_PACKAGE`, registers the table, links it into
/// the global namespace and calls each initializer with the module table.
pub fn create_module(
    vm: &mut LuaVM,
    name: &str,
    initializers: &[LuaValue],
) -> LuaResult<LuaTableRef> {
    let loaded = package_table(vm, "loaded");
    let existing = vm.modules.get(name).cloned().or_else(|| {
        loaded.as_ref().and_then(|l| match l.get_str(name) {
            LuaValue::Table(t) => Some(t),
            _ => None,
        })
    });
    let module = match existing {
        Some(module) => module,
        None => {
            debug!(module = name, "creating module");
            LuaTableRef::default()
        }
    };

    module.set_str("_NAME", LuaValue::from(name));
    module.set_str("_M", LuaValue::Table(module.clone()));
    module.set_str("_PACKAGE", LuaValue::from(package_prefix(name)));

    vm.modules.insert(SmolStr::new(name), module.clone());
    if let Some(loaded) = loaded {
        loaded.set_str(name, LuaValue::Table(module.clone()));
    }
    link_global_path(vm, name, &module)?;

    for init in initializers {
        vm.call(init, MultiValue::single(LuaValue::Table(module.clone())))?;
    }
    Ok(module)
}

/// Resolve `name`: the module registry, then `package.loaded`, then a
/// `package.preload` loader
pub fn require_module(vm: &mut LuaVM, name: &str) -> LuaResult<LuaValue> {
    if let Some(module) = vm.modules.get(name).cloned() {
        link_global_path(vm, name, &module)?;
        return Ok(LuaValue::Table(module));
    }

    let loaded = package_table(vm, "loaded");
    if let Some(loaded) = &loaded {
        let value = loaded.get_str(name);
        if !value.is_nil() {
            return Ok(value);
        }
    }

    let loader = package_table(vm, "preload")
        .map(|preload| preload.get_str(name))
        .unwrap_or_default();
    if loader.is_nil() {
        return Err(LuaError::Lookup(format!("module '{name}' not found")));
    }

    debug!(module = name, "running preload loader");
    let mut result = vm.call1(&loader, MultiValue::single(LuaValue::from(name)))?;
    if let Some(loaded) = &loaded {
        // A loader may register itself through module()
        let registered = loaded.get_str(name);
        if result.is_nil() {
            result = if registered.is_nil() {
                LuaValue::Boolean(true)
            } else {
                registered
            };
        }
        loaded.set_str(name, result.clone());
    }
    if let LuaValue::Table(module) = &result {
        link_global_path(vm, name, module)?;
    }
    Ok(result)
}

/// require(name)
pub(crate) fn lua_require(vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let name = check_string(&args, 1, "require")?;
    Ok(CallOutcome::one(require_module(vm, &name)?))
}

/// module(name, ...) - Extra arguments are initializers such as package.seeall
pub(crate) fn lua_module(vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let name = check_string(&args, 1, "module")?;
    let initializers = args.skip(1);
    let module = create_module(vm, &name, initializers.as_slice())?;
    Ok(CallOutcome::one(LuaValue::Table(module)))
}

/// package.seeall(module) - Module falls back to the globals for lookups
fn package_seeall(vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
    let module = check_table(&args, 1, "seeall")?;
    let mt = match module.get_metatable() {
        Some(mt) => mt,
        None => {
            let mt = LuaTableRef::default();
            module.set_metatable(Some(mt.clone()));
            mt
        }
    };
    mt.set_str("__index", LuaValue::Table(vm.globals()));
    Ok(CallOutcome::none())
}

fn package_loadlib(_vm: &mut LuaVM, _args: MultiValue) -> LuaResult<CallOutcome> {
    Err(LuaError::unsupported("package.loadlib"))
}
