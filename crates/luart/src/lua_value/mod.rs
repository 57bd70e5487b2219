// Lua value model
// Tagged values, ordered result sequences and native function handles
mod lua_convert;
mod lua_table;

use std::fmt;
use std::rc::Rc;

use smol_str::SmolStr;

use crate::lua_vm::{LuaResult, LuaVM};

pub use lua_convert::{format_float_e, format_float_f, format_float_g, number_to_string, parse_number};
pub use lua_table::{LuaTable, LuaTableRef};
pub(crate) use lua_table::check_store_key;

/// Kind tag of a LuaValue, used for type names and dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LuaValueKind {
    Nil,
    Boolean,
    Number,
    String,
    Table,
    Function,
}

impl LuaValueKind {
    pub fn name(self) -> &'static str {
        match self {
            LuaValueKind::Nil => "nil",
            LuaValueKind::Boolean => "boolean",
            LuaValueKind::Number => "number",
            LuaValueKind::String => "string",
            LuaValueKind::Table => "table",
            LuaValueKind::Function => "function",
        }
    }
}

/// A Lua value.
///
/// Primitives are held inline; tables and functions are shared handles
/// compared by identity.
#[derive(Clone, Default)]
pub enum LuaValue {
    #[default]
    Nil,
    Boolean(bool),
    Number(f64),
    String(SmolStr),
    Table(LuaTableRef),
    Function(LuaFunctionRef),
}

impl LuaValue {
    #[inline(always)]
    pub fn nil() -> Self {
        LuaValue::Nil
    }

    #[inline(always)]
    pub fn boolean(b: bool) -> Self {
        LuaValue::Boolean(b)
    }

    #[inline(always)]
    pub fn number(n: f64) -> Self {
        LuaValue::Number(n)
    }

    #[inline]
    pub fn string(s: impl Into<SmolStr>) -> Self {
        LuaValue::String(s.into())
    }

    /// Wrap a fresh table
    pub fn table(table: LuaTable) -> Self {
        LuaValue::Table(LuaTableRef::new(table))
    }

    /// Wrap a plain Rust function pointer
    pub fn cfunction(name: &str, func: CFunction) -> Self {
        LuaValue::Function(LuaFunctionRef::new(name, func))
    }

    /// Wrap a closure; used for stateful natives such as iterators
    pub fn closure<F>(name: &str, func: F) -> Self
    where
        F: Fn(&mut LuaVM, MultiValue) -> LuaResult<CallOutcome> + 'static,
    {
        LuaValue::Function(LuaFunctionRef::new(name, func))
    }

    #[inline]
    pub fn kind(&self) -> LuaValueKind {
        match self {
            LuaValue::Nil => LuaValueKind::Nil,
            LuaValue::Boolean(_) => LuaValueKind::Boolean,
            LuaValue::Number(_) => LuaValueKind::Number,
            LuaValue::String(_) => LuaValueKind::String,
            LuaValue::Table(_) => LuaValueKind::Table,
            LuaValue::Function(_) => LuaValueKind::Function,
        }
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }

    #[inline(always)]
    pub fn is_nil(&self) -> bool {
        matches!(self, LuaValue::Nil)
    }

    /// Everything except nil and false is true
    #[inline(always)]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, LuaValue::Nil | LuaValue::Boolean(false))
    }

    #[inline(always)]
    pub fn is_table(&self) -> bool {
        matches!(self, LuaValue::Table(_))
    }

    #[inline(always)]
    pub fn is_function(&self) -> bool {
        matches!(self, LuaValue::Function(_))
    }

    #[inline(always)]
    pub fn is_string(&self) -> bool {
        matches!(self, LuaValue::String(_))
    }

    #[inline(always)]
    pub fn is_number(&self) -> bool {
        matches!(self, LuaValue::Number(_))
    }

    #[inline]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            LuaValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[inline]
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            LuaValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            LuaValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[inline]
    pub fn as_table(&self) -> Option<&LuaTableRef> {
        match self {
            LuaValue::Table(t) => Some(t),
            _ => None,
        }
    }

    #[inline]
    pub fn as_function(&self) -> Option<&LuaFunctionRef> {
        match self {
            LuaValue::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Numeric view with string coercion, as used by arithmetic
    pub fn to_number(&self) -> Option<f64> {
        match self {
            LuaValue::Number(n) => Some(*n),
            LuaValue::String(s) => parse_number(s),
            _ => None,
        }
    }

    /// Integer view: numbers are truncated toward zero, strings are coerced
    pub fn to_integer(&self) -> Option<i64> {
        self.to_number()
            .filter(|n| n.is_finite())
            .map(|n| n.trunc() as i64)
    }

    /// Primitive equality without metamethods: values of different kinds
    /// differ, tables and functions compare by identity
    pub fn raw_equal(&self, other: &LuaValue) -> bool {
        match (self, other) {
            (LuaValue::Nil, LuaValue::Nil) => true,
            (LuaValue::Boolean(a), LuaValue::Boolean(b)) => a == b,
            (LuaValue::Number(a), LuaValue::Number(b)) => a == b,
            (LuaValue::String(a), LuaValue::String(b)) => a == b,
            (LuaValue::Table(a), LuaValue::Table(b)) => a.ptr_eq(b),
            (LuaValue::Function(a), LuaValue::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Text form ignoring `__tostring`
    pub fn to_string_raw(&self) -> String {
        match self {
            LuaValue::Nil => "nil".to_string(),
            LuaValue::Boolean(b) => b.to_string(),
            LuaValue::Number(n) => number_to_string(*n),
            LuaValue::String(s) => s.to_string(),
            LuaValue::Table(t) => format!("table: {:#010x}", t.addr()),
            LuaValue::Function(f) => format!("function: {:#010x}", f.addr()),
        }
    }
}

impl fmt::Debug for LuaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LuaValue::Nil => write!(f, "nil"),
            LuaValue::Boolean(b) => write!(f, "{b}"),
            LuaValue::Number(n) => write!(f, "{}", number_to_string(*n)),
            LuaValue::String(s) => write!(f, "{s:?}"),
            LuaValue::Table(t) => write!(f, "table: {:#010x}", t.addr()),
            LuaValue::Function(func) => write!(f, "function '{}': {:#010x}", func.name(), func.addr()),
        }
    }
}

/// Structural for primitives, identity for tables and functions
impl PartialEq for LuaValue {
    fn eq(&self, other: &Self) -> bool {
        self.raw_equal(other)
    }
}

impl From<bool> for LuaValue {
    fn from(b: bool) -> Self {
        LuaValue::Boolean(b)
    }
}

impl From<f64> for LuaValue {
    fn from(n: f64) -> Self {
        LuaValue::Number(n)
    }
}

impl From<i64> for LuaValue {
    fn from(n: i64) -> Self {
        LuaValue::Number(n as f64)
    }
}

impl From<i32> for LuaValue {
    fn from(n: i32) -> Self {
        LuaValue::Number(n as f64)
    }
}

impl From<usize> for LuaValue {
    fn from(n: usize) -> Self {
        LuaValue::Number(n as f64)
    }
}

impl From<&str> for LuaValue {
    fn from(s: &str) -> Self {
        LuaValue::String(SmolStr::new(s))
    }
}

impl From<String> for LuaValue {
    fn from(s: String) -> Self {
        LuaValue::String(SmolStr::from(s))
    }
}

impl From<SmolStr> for LuaValue {
    fn from(s: SmolStr) -> Self {
        LuaValue::String(s)
    }
}

impl From<LuaTableRef> for LuaValue {
    fn from(t: LuaTableRef) -> Self {
        LuaValue::Table(t)
    }
}

impl From<LuaFunctionRef> for LuaValue {
    fn from(f: LuaFunctionRef) -> Self {
        LuaValue::Function(f)
    }
}

/// Ordered sequence of values passed to or returned from a call
#[derive(Clone, Default, PartialEq)]
pub struct MultiValue {
    values: Vec<LuaValue>,
}

impl MultiValue {
    #[inline(always)]
    pub fn empty() -> Self {
        MultiValue { values: Vec::new() }
    }

    #[inline]
    pub fn single(value: LuaValue) -> Self {
        MultiValue {
            values: vec![value],
        }
    }

    #[inline]
    pub fn two(v1: LuaValue, v2: LuaValue) -> Self {
        MultiValue {
            values: vec![v1, v2],
        }
    }

    pub fn multiple(values: Vec<LuaValue>) -> Self {
        MultiValue { values }
    }

    #[inline(always)]
    pub fn all_values(self) -> Vec<LuaValue> {
        self.values
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[LuaValue] {
        &self.values
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First value, or nil for an empty sequence
    #[inline]
    pub fn first(&self) -> LuaValue {
        self.values.first().cloned().unwrap_or_default()
    }

    /// Value at 0-based index
    #[inline]
    pub fn get(&self, index: usize) -> Option<&LuaValue> {
        self.values.get(index)
    }

    /// Argument at 1-based position, nil when absent
    #[inline]
    pub fn arg(&self, index: usize) -> LuaValue {
        index
            .checked_sub(1)
            .and_then(|i| self.values.get(i))
            .cloned()
            .unwrap_or_default()
    }

    pub fn push(&mut self, value: LuaValue) {
        self.values.push(value);
    }

    pub fn prepend(&mut self, value: LuaValue) {
        self.values.insert(0, value);
    }

    /// Append the results of a call, splicing substituted sequences in place
    pub fn extend_outcome(&mut self, outcome: CallOutcome) {
        self.values.extend(outcome.into_values());
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LuaValue> {
        self.values.iter()
    }

    /// Drop the first `n` values
    pub fn skip(mut self, n: usize) -> Self {
        let n = n.min(self.values.len());
        self.values.drain(..n);
        self
    }
}

impl fmt::Debug for MultiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.values.iter()).finish()
    }
}

impl From<Vec<LuaValue>> for MultiValue {
    fn from(values: Vec<LuaValue>) -> Self {
        MultiValue { values }
    }
}

impl FromIterator<LuaValue> for MultiValue {
    fn from_iter<T: IntoIterator<Item = LuaValue>>(iter: T) -> Self {
        MultiValue {
            values: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for MultiValue {
    type Item = LuaValue;
    type IntoIter = std::vec::IntoIter<LuaValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// Result of invoking a native function.
///
/// `Substituted` marks a sequence that replaces the call's result wholesale
/// and is spliced into the caller's evaluation context (`unpack`, `select`).
/// It travels on the success channel, never through `LuaError`.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Values(MultiValue),
    Substituted(MultiValue),
}

impl CallOutcome {
    #[inline]
    pub fn none() -> Self {
        CallOutcome::Values(MultiValue::empty())
    }

    #[inline]
    pub fn one(value: impl Into<LuaValue>) -> Self {
        CallOutcome::Values(MultiValue::single(value.into()))
    }

    #[inline]
    pub fn values(values: impl Into<MultiValue>) -> Self {
        CallOutcome::Values(values.into())
    }

    #[inline]
    pub fn substituted(values: impl Into<MultiValue>) -> Self {
        CallOutcome::Substituted(values.into())
    }

    pub fn is_substituted(&self) -> bool {
        matches!(self, CallOutcome::Substituted(_))
    }

    /// Unwrap either channel into the plain result sequence
    pub fn into_values(self) -> MultiValue {
        match self {
            CallOutcome::Values(v) | CallOutcome::Substituted(v) => v,
        }
    }
}

/// Rust function callable from Lua
pub type CFunction = fn(&mut LuaVM, MultiValue) -> LuaResult<CallOutcome>;

type NativeBody = dyn Fn(&mut LuaVM, MultiValue) -> LuaResult<CallOutcome>;

pub struct LuaFunction {
    name: SmolStr,
    body: Box<NativeBody>,
}

/// Shared handle to a native function; equality is identity
#[derive(Clone)]
pub struct LuaFunctionRef(Rc<LuaFunction>);

impl LuaFunctionRef {
    pub fn new<F>(name: &str, body: F) -> Self
    where
        F: Fn(&mut LuaVM, MultiValue) -> LuaResult<CallOutcome> + 'static,
    {
        LuaFunctionRef(Rc::new(LuaFunction {
            name: SmolStr::new(name),
            body: Box::new(body),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Run the function body directly; prefer `LuaVM::invoke`, which also
    /// enforces the call depth limit
    #[inline]
    pub fn call(&self, vm: &mut LuaVM, args: MultiValue) -> LuaResult<CallOutcome> {
        (self.0.body)(vm, args)
    }

    #[inline]
    pub fn ptr_eq(&self, other: &LuaFunctionRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for LuaFunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "function '{}': {:#010x}", self.name(), self.addr())
    }
}
