// Library registration system for the standard libraries
// Installs Rust functions and values as global tables, plus argument helpers

use smol_str::SmolStr;

use crate::lua_value::{CFunction, LuaTableRef, LuaValue, MultiValue};
use crate::lua_vm::{LuaError, LuaResult, LuaVM};
use crate::stdlib;

/// Type for value initializers - functions that create values when the module loads
pub type ValueInitializer = fn(&mut LuaVM) -> LuaValue;

/// Entry in a library module - can be a function or a value
pub enum LibraryEntry {
    Function(CFunction),
    Value(ValueInitializer),
}

/// A library module containing multiple functions and values
pub struct LibraryModule {
    pub name: &'static str,
    pub entries: Vec<(&'static str, LibraryEntry)>,
}

impl LibraryModule {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Vec::new(),
        }
    }

    pub fn with_function(mut self, name: &'static str, func: CFunction) -> Self {
        self.entries.push((name, LibraryEntry::Function(func)));
        self
    }

    pub fn with_value(mut self, name: &'static str, value_init: ValueInitializer) -> Self {
        self.entries.push((name, LibraryEntry::Value(value_init)));
        self
    }
}

/// Builder for creating library modules out of function entries
#[macro_export]
macro_rules! lib_module {
    ($name:expr, {
        $($item_name:expr => $item:expr),* $(,)?
    }) => {{
        let mut module = $crate::lib_registry::LibraryModule::new($name);
        $(
            module.entries.push(($item_name, $crate::lib_registry::LibraryEntry::Function($item)));
        )*
        module
    }};
}

/// Registry for the standard libraries, in load order
pub struct LibraryRegistry {
    modules: Vec<LibraryModule>,
}

impl LibraryRegistry {
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    pub fn register(&mut self, module: LibraryModule) {
        self.modules.push(module);
    }

    /// Load all registered libraries into a VM
    pub fn load_all(&self, vm: &mut LuaVM) -> LuaResult<()> {
        for module in &self.modules {
            self.load_module(vm, module)?;
        }
        Ok(())
    }

    /// Load one module: `_G` entries become globals, any other module
    /// becomes a global table registered in `package.loaded`
    pub fn load_module(&self, vm: &mut LuaVM, module: &LibraryModule) -> LuaResult<()> {
        let lib_table = if module.name == "_G" {
            vm.globals()
        } else {
            LuaTableRef::default()
        };

        for (name, entry) in &module.entries {
            let value = match entry {
                LibraryEntry::Function(func) => LuaValue::cfunction(name, *func),
                LibraryEntry::Value(value_init) => value_init(vm),
            };
            lib_table.set_str(name, value);
        }

        if module.name == "_G" {
            return Ok(());
        }
        vm.set_global(module.name, LuaValue::Table(lib_table.clone()));

        // All strings share a metatable whose __index is the string library
        if module.name == "string" {
            let mt = LuaTableRef::default();
            mt.set_str("__index", LuaValue::Table(lib_table.clone()));
            vm.set_string_metatable(Some(mt));
        }

        if let LuaValue::Table(package) = vm.get_global("package")
            && let LuaValue::Table(loaded) = package.get_str("loaded")
        {
            loaded.set_str(module.name, LuaValue::Table(lib_table));
        }
        Ok(())
    }

    pub fn get_module(&self, name: &str) -> Option<&LibraryModule> {
        self.modules.iter().find(|m| m.name == name)
    }
}

impl Default for LibraryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry with every standard library
pub fn create_standard_registry() -> LibraryRegistry {
    let mut registry = LibraryRegistry::new();

    // package first so package.loaded exists for the others
    registry.register(stdlib::package::create_package_lib());

    registry.register(stdlib::basic::create_basic_lib());
    registry.register(stdlib::string::create_string_lib());
    registry.register(stdlib::table::create_table_lib());
    registry.register(stdlib::math::create_math_lib());
    registry.register(stdlib::bit::create_bit_lib());
    registry.register(stdlib::io::create_io_lib());
    registry.register(stdlib::os::create_os_lib());
    registry.register(stdlib::coroutine::create_coroutine_lib());
    registry.register(stdlib::debug::create_debug_lib());

    registry
}

fn arg_error(args: &MultiValue, index: usize, func_name: &str, expected: &str) -> LuaError {
    let got = match args.get(index - 1) {
        Some(value) => value.type_name(),
        None => "no value",
    };
    LuaError::Type(format!(
        "bad argument #{index} to '{func_name}' ({expected} expected, got {got})"
    ))
}

/// Argument that must be present (nil allowed); 1 based index
pub fn check_any(args: &MultiValue, index: usize, func_name: &str) -> LuaResult<LuaValue> {
    match args.get(index - 1) {
        Some(value) => Ok(value.clone()),
        None => Err(LuaError::Type(format!(
            "bad argument #{index} to '{func_name}' (value expected)"
        ))),
    }
}

pub fn check_table(args: &MultiValue, index: usize, func_name: &str) -> LuaResult<LuaTableRef> {
    match args.get(index - 1) {
        Some(LuaValue::Table(t)) => Ok(t.clone()),
        _ => Err(arg_error(args, index, func_name, "table")),
    }
}

/// Number argument; numeric strings are coerced
pub fn check_number(args: &MultiValue, index: usize, func_name: &str) -> LuaResult<f64> {
    args.get(index - 1)
        .and_then(LuaValue::to_number)
        .ok_or_else(|| arg_error(args, index, func_name, "number"))
}

/// Integer argument, truncated toward zero
pub fn check_integer(args: &MultiValue, index: usize, func_name: &str) -> LuaResult<i64> {
    args.get(index - 1)
        .and_then(LuaValue::to_integer)
        .ok_or_else(|| arg_error(args, index, func_name, "number"))
}

/// String argument; numbers are converted to their text form
pub fn check_string(args: &MultiValue, index: usize, func_name: &str) -> LuaResult<SmolStr> {
    match args.get(index - 1) {
        Some(LuaValue::String(s)) => Ok(s.clone()),
        Some(value @ LuaValue::Number(_)) => Ok(SmolStr::from(value.to_string_raw())),
        _ => Err(arg_error(args, index, func_name, "string")),
    }
}

pub fn opt_number(args: &MultiValue, index: usize, func_name: &str) -> LuaResult<Option<f64>> {
    match args.get(index - 1) {
        None | Some(LuaValue::Nil) => Ok(None),
        Some(_) => check_number(args, index, func_name).map(Some),
    }
}

pub fn opt_integer(args: &MultiValue, index: usize, func_name: &str) -> LuaResult<Option<i64>> {
    match args.get(index - 1) {
        None | Some(LuaValue::Nil) => Ok(None),
        Some(_) => check_integer(args, index, func_name).map(Some),
    }
}

pub fn opt_string(args: &MultiValue, index: usize, func_name: &str) -> LuaResult<Option<SmolStr>> {
    match args.get(index - 1) {
        None | Some(LuaValue::Nil) => Ok(None),
        Some(_) => check_string(args, index, func_name).map(Some),
    }
}
