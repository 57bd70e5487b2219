// Lua pattern engine
// Patterns are parsed, checked for constructs the translation cannot express,
// and translated to `regex` programs cached per runtime instance
mod class;
mod matcher;
mod parser;

use std::rc::Rc;

use smol_str::SmolStr;
use tracing::trace;

use crate::lua_vm::{LuaResult, LuaVM};

pub use matcher::{Capture, CompiledPattern, PatternMatch};

/// Compiled patterns kept per runtime before the cache is reset
const PATTERN_CACHE_LIMIT: usize = 256;

/// Compile `pattern`, reusing the runtime's cached translation
pub fn compile(vm: &mut LuaVM, pattern: &str) -> LuaResult<Rc<CompiledPattern>> {
    if let Some(compiled) = vm.pattern_cache.get(pattern) {
        return Ok(compiled.clone());
    }
    let compiled = Rc::new(CompiledPattern::new(pattern)?);
    trace!(pattern, "compiled pattern");
    if vm.pattern_cache.len() >= PATTERN_CACHE_LIMIT {
        vm.pattern_cache.clear();
    }
    vm.pattern_cache
        .insert(SmolStr::new(pattern), compiled.clone());
    Ok(compiled)
}

/// True when the pattern has no magic characters and can be searched for
/// as a plain substring
pub fn is_plain_pattern(pattern: &str) -> bool {
    !pattern
        .chars()
        .any(|c| matches!(c, '^' | '$' | '*' | '+' | '?' | '.' | '(' | ')' | '[' | ']' | '%' | '-'))
}
