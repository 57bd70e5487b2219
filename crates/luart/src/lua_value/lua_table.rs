// Lua table implementation
// Five disjoint key domains, partitioned at insertion time by key variant:
// - string keys
// - array-eligible integer keys (positive, whole), in array or sparse mode
// - other numeric keys
// - boolean keys
// - table/function keys, compared by identity
use std::cell::{Cell, OnceCell, Ref, RefCell, RefMut};
use std::rc::Rc;

use ahash::AHashMap;
use smol_str::SmolStr;

use super::LuaValue;
use crate::lua_vm::{LuaError, LuaResult};

/// Largest integer that round-trips through f64 exactly
const MAX_SAFE_INTEGER: f64 = 9007199254740992.0;

/// Storage for array-eligible integer keys.
///
/// Array mode keeps the contiguous run `1..=items.len()` in a dense vector
/// (slot `i` holds key `i + 1`) and any keys past the first gap in
/// `overflow`. `items` never contains nil and key `items.len() + 1` is never
/// in `overflow`.
#[derive(Clone)]
enum IntKeys {
    Array {
        items: Vec<LuaValue>,
        overflow: AHashMap<u64, LuaValue>,
    },
    Sparse(AHashMap<u64, LuaValue>),
}

/// Which domain a key lives in
enum KeySlot<'a> {
    Str(&'a SmolStr),
    Int(u64),
    Float(u64),
    Bool(bool),
    Ref,
}

fn classify_number(n: f64) -> KeySlot<'static> {
    if n >= 1.0 && n <= MAX_SAFE_INTEGER && n.fract() == 0.0 {
        KeySlot::Int(n as u64)
    } else if n == 0.0 {
        // -0.0 and 0.0 are the same key
        KeySlot::Float(0.0f64.to_bits())
    } else {
        KeySlot::Float(n.to_bits())
    }
}

/// Domain of a key used for reading; nil and NaN have none
fn lookup_slot(key: &LuaValue) -> Option<KeySlot<'_>> {
    match key {
        LuaValue::Nil => None,
        LuaValue::Number(n) if n.is_nan() => None,
        LuaValue::Number(n) => Some(classify_number(*n)),
        LuaValue::String(s) => Some(KeySlot::Str(s)),
        LuaValue::Boolean(b) => Some(KeySlot::Bool(*b)),
        LuaValue::Table(_) | LuaValue::Function(_) => Some(KeySlot::Ref),
    }
}

/// Domain of a key used for writing; nil and NaN are key errors
fn store_slot(key: &LuaValue) -> LuaResult<KeySlot<'_>> {
    match key {
        LuaValue::Nil => Err(LuaError::Key("table index is nil".to_string())),
        LuaValue::Number(n) if n.is_nan() => Err(LuaError::Key("table index is NaN".to_string())),
        _ => lookup_slot(key).ok_or_else(|| LuaError::Key("invalid table index".to_string())),
    }
}

/// Reject keys no table can store, before any metamethod sees them
pub(crate) fn check_store_key(key: &LuaValue) -> LuaResult<()> {
    store_slot(key).map(|_| ())
}

pub struct LuaTable {
    strings: AHashMap<SmolStr, LuaValue>,
    ints: IntKeys,
    floats: AHashMap<u64, LuaValue>,
    bools: [Option<LuaValue>; 2],
    refs: Vec<(LuaValue, LuaValue)>,
    metatable: Option<LuaTableRef>,
    /// Border cache, cleared by every mutation
    length: Option<usize>,
    /// Key order walked by `next`, dropped when a key is added. Removed keys
    /// stay listed so a traversal may clear fields as it goes
    traversal: OnceCell<Vec<LuaValue>>,
    /// Position in `traversal` of the key `next` returned last
    traversal_hint: Cell<usize>,
}

impl Default for LuaTable {
    fn default() -> Self {
        Self::new()
    }
}

impl LuaTable {
    /// Create an empty table (sparse integer mode)
    pub fn new() -> Self {
        LuaTable {
            strings: AHashMap::new(),
            ints: IntKeys::Sparse(AHashMap::new()),
            floats: AHashMap::new(),
            bools: [None, None],
            refs: Vec::new(),
            metatable: None,
            length: None,
            traversal: OnceCell::new(),
            traversal_hint: Cell::new(0),
        }
    }

    /// Create a table in array mode holding `values` at keys `1..=n`
    pub fn from_array(values: Vec<LuaValue>) -> Self {
        let mut table = LuaTable::new();
        let mut sparse = AHashMap::with_capacity(values.len());
        for (i, value) in values.into_iter().enumerate() {
            if !value.is_nil() {
                sparse.insert(i as u64 + 1, value);
            }
        }
        table.ints = IntKeys::Sparse(sparse);
        table.ensure_array_mode();
        table
    }

    /// Table constructor: seed every domain from a flat `k1, v1, k2, v2, ...`
    /// list, then lay the optional positional prefix over keys `1..=n`.
    ///
    /// Pairs with a nil value are skipped; nil or NaN keys are key errors.
    pub fn construct(prefix: Option<Vec<LuaValue>>, flat: &[LuaValue]) -> LuaResult<Self> {
        if flat.len() % 2 != 0 {
            return Err(LuaError::Type(
                "table constructor expects key/value pairs".to_string(),
            ));
        }
        let mut table = LuaTable::new();
        for pair in flat.chunks_exact(2) {
            if pair[1].is_nil() {
                store_slot(&pair[0])?;
                continue;
            }
            table.raw_set(pair[0].clone(), pair[1].clone())?;
        }
        if let Some(prefix) = prefix {
            for (i, value) in prefix.into_iter().enumerate() {
                table.raw_set(LuaValue::Number((i + 1) as f64), value)?;
            }
            table.ensure_array_mode();
        }
        Ok(table)
    }

    pub fn get_metatable(&self) -> Option<LuaTableRef> {
        self.metatable.clone()
    }

    pub fn set_metatable(&mut self, mt: Option<LuaTableRef>) {
        self.metatable = mt;
    }

    pub fn is_array_mode(&self) -> bool {
        matches!(self.ints, IntKeys::Array { .. })
    }

    /// Generic key read; absent keys (and nil/NaN keys) read as nil
    pub fn raw_get(&self, key: &LuaValue) -> LuaValue {
        match lookup_slot(key) {
            Some(slot) => self.get_slot(key, &slot),
            None => LuaValue::Nil,
        }
    }

    fn get_slot(&self, key: &LuaValue, slot: &KeySlot<'_>) -> LuaValue {
        match slot {
            KeySlot::Str(s) => self.strings.get(s.as_str()).cloned().unwrap_or_default(),
            KeySlot::Int(i) => self.get_index(*i),
            KeySlot::Float(bits) => self.floats.get(bits).cloned().unwrap_or_default(),
            KeySlot::Bool(b) => self.bools[*b as usize].clone().unwrap_or_default(),
            KeySlot::Ref => self
                .refs
                .iter()
                .find(|(k, _)| k.raw_equal(key))
                .map(|(_, v)| v.clone())
                .unwrap_or_default(),
        }
    }

    /// String key read without building a LuaValue key
    pub fn get_str(&self, key: &str) -> LuaValue {
        self.strings.get(key).cloned().unwrap_or_default()
    }

    /// Read positive integer key `index`
    pub fn get_int(&self, index: i64) -> LuaValue {
        if index < 1 {
            return self.raw_get(&LuaValue::Number(index as f64));
        }
        self.get_index(index as u64)
    }

    fn get_index(&self, index: u64) -> LuaValue {
        match &self.ints {
            IntKeys::Array { items, overflow } => {
                let slot = (index - 1) as usize;
                if slot < items.len() {
                    items[slot].clone()
                } else {
                    overflow.get(&index).cloned().unwrap_or_default()
                }
            }
            IntKeys::Sparse(map) => map.get(&index).cloned().unwrap_or_default(),
        }
    }

    /// Generic key write; assigning nil removes the entry.
    ///
    /// Integer keys switch the table to sparse mode first.
    pub fn raw_set(&mut self, key: LuaValue, value: LuaValue) -> LuaResult<()> {
        self.length = None;
        if !value.is_nil() && self.raw_get(&key).is_nil() {
            self.traversal.take();
        }
        match store_slot(&key)? {
            KeySlot::Str(s) => {
                if value.is_nil() {
                    self.strings.remove(s.as_str());
                } else {
                    self.strings.insert(s.clone(), value);
                }
            }
            KeySlot::Int(i) => {
                self.ensure_sparse_mode();
                if let IntKeys::Sparse(map) = &mut self.ints {
                    if value.is_nil() {
                        map.remove(&i);
                    } else {
                        map.insert(i, value);
                    }
                }
            }
            KeySlot::Float(bits) => {
                if value.is_nil() {
                    self.floats.remove(&bits);
                } else {
                    self.floats.insert(bits, value);
                }
            }
            KeySlot::Bool(b) => {
                self.bools[b as usize] = if value.is_nil() { None } else { Some(value) };
            }
            KeySlot::Ref => {
                let existing = self.refs.iter().position(|(k, _)| k.raw_equal(&key));
                match (existing, value.is_nil()) {
                    (Some(pos), true) => {
                        self.refs.remove(pos);
                    }
                    (Some(pos), false) => self.refs[pos].1 = value,
                    (None, true) => {}
                    (None, false) => self.refs.push((key, value)),
                }
            }
        }
        Ok(())
    }

    /// Convenience string-key write
    pub fn set_str(&mut self, key: &str, value: LuaValue) {
        self.length = None;
        if !value.is_nil() && !self.strings.contains_key(key) {
            self.traversal.take();
        }
        if value.is_nil() {
            self.strings.remove(key);
        } else {
            self.strings.insert(SmolStr::new(key), value);
        }
    }

    /// Switch integer keys to array mode: the ascending run starting at 1
    /// becomes the dense sequence, later keys go to the overflow map
    pub fn ensure_array_mode(&mut self) {
        let IntKeys::Sparse(map) = &mut self.ints else {
            return;
        };
        let mut overflow = std::mem::take(map);
        let mut items = Vec::with_capacity(overflow.len());
        while let Some(value) = overflow.remove(&(items.len() as u64 + 1)) {
            items.push(value);
        }
        self.ints = IntKeys::Array { items, overflow };
    }

    /// Switch integer keys back to a plain key -> value map
    pub fn ensure_sparse_mode(&mut self) {
        let IntKeys::Array { items, overflow } = &mut self.ints else {
            return;
        };
        let mut map = std::mem::take(overflow);
        map.reserve(items.len());
        for (i, value) in std::mem::take(items).into_iter().enumerate() {
            map.insert(i as u64 + 1, value);
        }
        self.ints = IntKeys::Sparse(map);
    }

    /// Border: scan up from 1 until the first absent integer key, cached
    /// until the next mutation
    pub fn length(&mut self) -> usize {
        if let Some(len) = self.length {
            return len;
        }
        let len = match &self.ints {
            IntKeys::Array { items, .. } => items.len(),
            IntKeys::Sparse(map) => {
                let mut n = 0u64;
                while map.contains_key(&(n + 1)) {
                    n += 1;
                }
                n as usize
            }
        };
        self.length = Some(len);
        len
    }

    /// Largest positive numeric key, 0 if none
    pub fn maxn(&self) -> f64 {
        let int_max = match &self.ints {
            IntKeys::Array { items, overflow } => overflow
                .keys()
                .copied()
                .max()
                .unwrap_or(0)
                .max(items.len() as u64),
            IntKeys::Sparse(map) => map.keys().copied().max().unwrap_or(0),
        } as f64;
        self.floats
            .keys()
            .map(|bits| f64::from_bits(*bits))
            .fold(int_max, f64::max)
            .max(0.0)
    }

    /// Array view used by the table library; switches to array mode
    pub fn array_items(&mut self) -> &[LuaValue] {
        self.ensure_array_mode();
        match &self.ints {
            IntKeys::Array { items, .. } => items,
            IntKeys::Sparse(_) => &[],
        }
    }

    /// Insert at 1-based `pos` within `1..=len + 1`, shifting later items up
    pub fn array_insert(&mut self, pos: usize, value: LuaValue) -> LuaResult<()> {
        self.ensure_array_mode();
        self.length = None;
        self.traversal.take();
        let IntKeys::Array { items, overflow } = &mut self.ints else {
            return Ok(());
        };
        if pos == 0 || pos > items.len() + 1 {
            return Err(LuaError::Type(
                "bad argument #2 to 'insert' (position out of bounds)".to_string(),
            ));
        }
        if value.is_nil() {
            // A nil splits the sequence at `pos`
            let tail = items.split_off(pos - 1);
            for (i, v) in tail.into_iter().enumerate() {
                overflow.insert((pos + 1 + i) as u64, v);
            }
            return Ok(());
        }
        items.insert(pos - 1, value);
        while let Some(next) = overflow.remove(&(items.len() as u64 + 1)) {
            items.push(next);
        }
        Ok(())
    }

    /// Remove 1-based `pos`, shifting later items down; nil if out of range
    pub fn array_remove(&mut self, pos: usize) -> LuaValue {
        self.ensure_array_mode();
        self.length = None;
        self.traversal.take();
        match &mut self.ints {
            IntKeys::Array { items, .. } if pos >= 1 && pos <= items.len() => items.remove(pos - 1),
            _ => LuaValue::Nil,
        }
    }

    /// Write `values` over keys `1..=n`, e.g. after sorting
    pub fn array_replace(&mut self, values: Vec<LuaValue>) {
        self.ensure_array_mode();
        self.length = None;
        self.traversal.take();
        if let IntKeys::Array { items, .. } = &mut self.ints
            && items.len() == values.len()
            && values.iter().all(|v| !v.is_nil())
        {
            *items = values;
            return;
        }
        self.ensure_sparse_mode();
        if let IntKeys::Sparse(map) = &mut self.ints {
            for (i, value) in values.into_iter().enumerate() {
                let key = i as u64 + 1;
                if value.is_nil() {
                    map.remove(&key);
                } else {
                    map.insert(key, value);
                }
            }
        }
        self.ensure_array_mode();
    }

    /// All keys in traversal order: strings, integers ascending, other
    /// numbers, booleans, identity keys
    pub fn keys(&self) -> Vec<LuaValue> {
        let mut keys: Vec<LuaValue> = self
            .strings
            .keys()
            .map(|k| LuaValue::String(k.clone()))
            .collect();

        let mut ints: Vec<u64> = match &self.ints {
            IntKeys::Array { items, overflow } => (1..=items.len() as u64)
                .chain(overflow.keys().copied())
                .collect(),
            IntKeys::Sparse(map) => map.keys().copied().collect(),
        };
        ints.sort_unstable();
        keys.extend(ints.into_iter().map(|i| LuaValue::Number(i as f64)));

        keys.extend(self.floats.keys().map(|bits| LuaValue::Number(f64::from_bits(*bits))));
        for (i, entry) in self.bools.iter().enumerate() {
            if entry.is_some() {
                keys.push(LuaValue::Boolean(i == 1));
            }
        }
        keys.extend(self.refs.iter().map(|(k, _)| k.clone()));
        keys
    }

    /// Traversal step: the entry after `key` (nil starts), None at the end.
    ///
    /// The key order is computed once and reused until a key is added; a
    /// walk that passes back the previous key resumes without a search.
    pub fn next(&self, key: &LuaValue) -> LuaResult<Option<(LuaValue, LuaValue)>> {
        let keys = self.traversal.get_or_init(|| self.keys());
        let start = if key.is_nil() {
            0
        } else {
            let hint = self.traversal_hint.get();
            let found = if keys.get(hint).is_some_and(|k| k.raw_equal(key)) {
                Some(hint)
            } else {
                keys.iter().position(|k| k.raw_equal(key))
            };
            match found {
                Some(pos) => pos + 1,
                None => return Err(LuaError::Key("invalid key to 'next'".to_string())),
            }
        };
        for (pos, k) in keys.iter().enumerate().skip(start) {
            let v = self.raw_get(k);
            if !v.is_nil() {
                self.traversal_hint.set(pos);
                return Ok(Some((k.clone(), v)));
            }
        }
        Ok(None)
    }

    /// Number of stored entries across all domains
    pub fn entry_count(&self) -> usize {
        let ints = match &self.ints {
            IntKeys::Array { items, overflow } => items.len() + overflow.len(),
            IntKeys::Sparse(map) => map.len(),
        };
        self.strings.len()
            + ints
            + self.floats.len()
            + self.bools.iter().filter(|b| b.is_some()).count()
            + self.refs.len()
    }
}

/// Shared, identity-compared handle to a table
#[derive(Clone, Default)]
pub struct LuaTableRef(Rc<RefCell<LuaTable>>);

impl LuaTableRef {
    pub fn new(table: LuaTable) -> Self {
        LuaTableRef(Rc::new(RefCell::new(table)))
    }

    #[inline]
    pub fn borrow(&self) -> Ref<'_, LuaTable> {
        self.0.borrow()
    }

    #[inline]
    pub fn borrow_mut(&self) -> RefMut<'_, LuaTable> {
        self.0.borrow_mut()
    }

    #[inline]
    pub fn ptr_eq(&self, other: &LuaTableRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn raw_get(&self, key: &LuaValue) -> LuaValue {
        self.0.borrow().raw_get(key)
    }

    pub fn raw_set(&self, key: LuaValue, value: LuaValue) -> LuaResult<()> {
        self.0.borrow_mut().raw_set(key, value)
    }

    pub fn get_str(&self, key: &str) -> LuaValue {
        self.0.borrow().get_str(key)
    }

    pub fn set_str(&self, key: &str, value: LuaValue) {
        self.0.borrow_mut().set_str(key, value);
    }

    pub fn get_int(&self, index: i64) -> LuaValue {
        self.0.borrow().get_int(index)
    }

    pub fn length(&self) -> usize {
        self.0.borrow_mut().length()
    }

    pub fn get_metatable(&self) -> Option<LuaTableRef> {
        self.0.borrow().get_metatable()
    }

    pub fn set_metatable(&self, mt: Option<LuaTableRef>) {
        self.0.borrow_mut().set_metatable(mt);
    }
}

impl std::fmt::Debug for LuaTableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "table: {:#010x}", self.addr())
    }
}
