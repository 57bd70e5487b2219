/// Per-instance runtime limits and knobs
#[derive(Debug, Clone)]
pub struct SafeOption {
    /// Nested native calls allowed before `LuaError::StackOverflow`
    pub max_call_depth: usize,
    /// Longest `__index` / `__newindex` chain followed before giving up
    pub max_index_chain: usize,
    /// Upper bound for strings built by `string.rep`
    pub max_string_size: usize,
    /// Seed for `math.random`; `None` seeds from entropy
    pub random_seed: Option<u64>,
}

impl Default for SafeOption {
    fn default() -> Self {
        Self {
            max_call_depth: 200,
            max_index_chain: 100,
            max_string_size: 1 << 30,
            random_seed: None,
        }
    }
}
