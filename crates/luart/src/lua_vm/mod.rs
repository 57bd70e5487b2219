// Lua runtime instance
// Owns the global environment and every piece of per-instance state
mod execute;
mod lua_error;
mod safe_option;

use std::io::Write;
use std::rc::Rc;
use std::time::Instant;

use ahash::AHashMap;
use rand::SeedableRng;
use rand::rngs::StdRng;
use smol_str::SmolStr;

use crate::lib_registry;
use crate::lua_value::{LuaTable, LuaTableRef, LuaValue, MultiValue};
use crate::stdlib::Stdlib;
use crate::stdlib::package;
use crate::stdlib::string::pattern::CompiledPattern;
use crate::stdlib::string::string_format::FormatSpec;

pub use execute::{ArithOp, TmKind};
pub use lua_error::LuaError;
pub use safe_option::SafeOption;

pub type LuaResult<T> = Result<T, LuaError>;

/// Producer of callables from source text, installed by an external loader
pub type ChunkLoader = dyn Fn(&mut LuaVM, &str) -> LuaResult<LuaValue>;

pub struct LuaVM {
    globals: LuaTableRef,
    /// Module registry: dotted name -> module table
    pub(crate) modules: AHashMap<SmolStr, LuaTableRef>,
    string_metatable: Option<LuaTableRef>,
    pub(crate) rng: StdRng,
    clock_start: Instant,
    output: Box<dyn Write>,
    pub(crate) format_cache: AHashMap<SmolStr, Rc<FormatSpec>>,
    pub(crate) pattern_cache: AHashMap<SmolStr, Rc<CompiledPattern>>,
    chunk_loader: Option<Rc<ChunkLoader>>,
    pub(crate) safe_option: SafeOption,
    pub(crate) call_depth: usize,
}

impl LuaVM {
    pub fn new(option: SafeOption) -> Self {
        let rng = match option.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let globals = LuaTableRef::new(LuaTable::new());
        globals.set_str("_G", LuaValue::Table(globals.clone()));
        LuaVM {
            globals,
            modules: AHashMap::new(),
            string_metatable: None,
            rng,
            clock_start: Instant::now(),
            output: Box::new(std::io::stdout()),
            format_cache: AHashMap::new(),
            pattern_cache: AHashMap::new(),
            chunk_loader: None,
            safe_option: option,
            call_depth: 0,
        }
    }

    /// Install standard libraries into the global environment
    pub fn open_stdlib(&mut self, lib: Stdlib) -> LuaResult<()> {
        let registry = lib_registry::create_standard_registry();
        if lib == Stdlib::All {
            return registry.load_all(self);
        }
        // package must exist so the library lands in package.loaded
        if lib != Stdlib::Package && self.get_global("package").is_nil() {
            if let Some(module) = registry.get_module(Stdlib::Package.module_name()) {
                registry.load_module(self, module)?;
            }
        }
        match registry.get_module(lib.module_name()) {
            Some(module) => registry.load_module(self, module),
            None => Ok(()),
        }
    }

    pub fn safe_option(&self) -> &SafeOption {
        &self.safe_option
    }

    /// The global environment table
    pub fn globals(&self) -> LuaTableRef {
        self.globals.clone()
    }

    pub fn get_global(&self, name: &str) -> LuaValue {
        self.globals.get_str(name)
    }

    pub fn set_global(&mut self, name: &str, value: LuaValue) {
        self.globals.set_str(name, value);
    }

    /// Empty table value
    pub fn new_table(&self) -> LuaValue {
        LuaValue::table(LuaTable::new())
    }

    /// Table constructor: flat `k1, v1, k2, v2, ...` pairs plus an optional
    /// positional prefix laid over keys `1..=n`
    pub fn create_table(
        &self,
        prefix: Option<Vec<LuaValue>>,
        flat: &[LuaValue],
    ) -> LuaResult<LuaValue> {
        Ok(LuaValue::table(LuaTable::construct(prefix, flat)?))
    }

    pub fn string_metatable(&self) -> Option<LuaTableRef> {
        self.string_metatable.clone()
    }

    pub fn set_string_metatable(&mut self, mt: Option<LuaTableRef>) {
        self.string_metatable = mt;
    }

    /// Redirect `print` and `io.write`
    pub fn set_output(&mut self, output: Box<dyn Write>) {
        self.output = output;
    }

    pub(crate) fn write_output(&mut self, text: &str) -> LuaResult<()> {
        self.output
            .write_all(text.as_bytes())
            .and_then(|_| self.output.flush())
            .map_err(|e| LuaError::raise(e.to_string()))
    }

    /// Install the producer used by `load` and `loadstring`
    pub fn set_chunk_loader<F>(&mut self, loader: F)
    where
        F: Fn(&mut LuaVM, &str) -> LuaResult<LuaValue> + 'static,
    {
        self.chunk_loader = Some(Rc::new(loader));
    }

    pub(crate) fn chunk_loader(&self) -> Option<Rc<ChunkLoader>> {
        self.chunk_loader.clone()
    }

    /// Seconds elapsed since this instance was created
    pub fn clock(&self) -> f64 {
        self.clock_start.elapsed().as_secs_f64()
    }

    /// `tostring`: honours `__tostring`, otherwise the raw text form
    pub fn tostring(&mut self, value: &LuaValue) -> LuaResult<LuaValue> {
        if let Some(handler) = self.get_metamethod(value, TmKind::ToString) {
            return self.call1(&handler, MultiValue::single(value.clone()));
        }
        Ok(match value {
            LuaValue::String(_) => value.clone(),
            _ => LuaValue::from(value.to_string_raw()),
        })
    }

    /// Text form used by `print` and `table.concat`
    pub fn tostring_text(&mut self, value: &LuaValue) -> LuaResult<String> {
        Ok(self.tostring(value)?.to_string_raw())
    }

    /// Create (or reopen) module `name`, then run `initializers` on it
    pub fn create_module(
        &mut self,
        name: &str,
        initializers: &[LuaValue],
    ) -> LuaResult<LuaTableRef> {
        package::create_module(self, name, initializers)
    }

    /// Resolve a module previously created or preloaded
    pub fn require(&mut self, name: &str) -> LuaResult<LuaValue> {
        package::require_module(self, name)
    }
}

impl Default for LuaVM {
    fn default() -> Self {
        Self::new(SafeOption::default())
    }
}
