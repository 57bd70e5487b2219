use crate::lua_value::{LuaTableRef, LuaValue};
use crate::lua_vm::LuaVM;

/// Metatable handles consulted by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TmKind {
    Index,
    NewIndex,
    Eq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Unm,
    Lt,
    Le,
    Concat,
    Call,
    Len,
    ToString,
    Metatable,
}

impl TmKind {
    /// Metatable key of this handle
    pub const fn name(self) -> &'static str {
        match self {
            TmKind::Index => "__index",
            TmKind::NewIndex => "__newindex",
            TmKind::Eq => "__eq",
            TmKind::Add => "__add",
            TmKind::Sub => "__sub",
            TmKind::Mul => "__mul",
            TmKind::Div => "__div",
            TmKind::Mod => "__mod",
            TmKind::Pow => "__pow",
            TmKind::Unm => "__unm",
            TmKind::Lt => "__lt",
            TmKind::Le => "__le",
            TmKind::Concat => "__concat",
            TmKind::Call => "__call",
            TmKind::Len => "__len",
            TmKind::ToString => "__tostring",
            TmKind::Metatable => "__metatable",
        }
    }
}

impl LuaVM {
    /// Metatable of any value; strings share one
    pub fn get_metatable(&self, value: &LuaValue) -> Option<LuaTableRef> {
        match value {
            LuaValue::Table(t) => t.get_metatable(),
            LuaValue::String(_) => self.string_metatable(),
            _ => None,
        }
    }

    /// Handle `tm` from the value's metatable, None when absent or nil
    pub fn get_metamethod(&self, value: &LuaValue, tm: TmKind) -> Option<LuaValue> {
        let mt = self.get_metatable(value)?;
        let handler = mt.get_str(tm.name());
        (!handler.is_nil()).then_some(handler)
    }

    /// Handle present on both operands as the very same reference.
    ///
    /// Ordering and equality only dispatch through this: two different
    /// implementations on the two sides are never mixed.
    pub(crate) fn shared_metamethod(
        &self,
        a: &LuaValue,
        b: &LuaValue,
        tm: TmKind,
    ) -> Option<LuaValue> {
        let left = self.get_metamethod(a, tm)?;
        let right = self.get_metamethod(b, tm)?;
        left.raw_equal(&right).then_some(left)
    }
}
