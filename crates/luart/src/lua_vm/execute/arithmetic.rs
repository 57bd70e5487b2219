use super::{TmKind, describe};
use crate::lua_value::{LuaValue, MultiValue};
use crate::lua_vm::{LuaError, LuaResult, LuaVM};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Unm,
}

impl ArithOp {
    fn tm(self) -> TmKind {
        match self {
            ArithOp::Add => TmKind::Add,
            ArithOp::Sub => TmKind::Sub,
            ArithOp::Mul => TmKind::Mul,
            ArithOp::Div => TmKind::Div,
            ArithOp::Mod => TmKind::Mod,
            ArithOp::Pow => TmKind::Pow,
            ArithOp::Unm => TmKind::Unm,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "subtract",
            ArithOp::Mul => "multiply",
            ArithOp::Div => "divide",
            ArithOp::Mod => "take the modulo of",
            ArithOp::Pow => "exponentiate",
            ArithOp::Unm => "negate",
        }
    }

    /// Numeric semantics of the operator
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div => a / b,
            ArithOp::Mod => lua_mod(a, b),
            ArithOp::Pow => a.powf(b),
            ArithOp::Unm => -a,
        }
    }
}

/// Floored modulo: the result takes the sign of the divisor
#[inline]
pub fn lua_mod(a: f64, b: f64) -> f64 {
    a - (a / b).floor() * b
}

impl LuaVM {
    /// Arithmetic with string coercion and `__op` fallback (left operand's
    /// handler first, then the right's).
    ///
    /// Unary minus passes its operand twice, like binary operators.
    pub fn arith(&mut self, op: ArithOp, a: &LuaValue, b: &LuaValue) -> LuaResult<LuaValue> {
        if let (Some(x), Some(y)) = (a.to_number(), b.to_number()) {
            return Ok(LuaValue::Number(op.apply(x, y)));
        }
        let handler = self
            .get_metamethod(a, op.tm())
            .or_else(|| self.get_metamethod(b, op.tm()));
        match handler {
            Some(handler) => self.call1(&handler, MultiValue::two(a.clone(), b.clone())),
            None if op == ArithOp::Unm => Err(LuaError::Type(format!(
                "attempt to {} {}",
                op.verb(),
                describe(a)
            ))),
            None => Err(LuaError::Type(format!(
                "attempt to {} {} and {}",
                op.verb(),
                describe(a),
                describe(b)
            ))),
        }
    }

    pub fn add(&mut self, a: &LuaValue, b: &LuaValue) -> LuaResult<LuaValue> {
        self.arith(ArithOp::Add, a, b)
    }

    pub fn sub(&mut self, a: &LuaValue, b: &LuaValue) -> LuaResult<LuaValue> {
        self.arith(ArithOp::Sub, a, b)
    }

    pub fn mul(&mut self, a: &LuaValue, b: &LuaValue) -> LuaResult<LuaValue> {
        self.arith(ArithOp::Mul, a, b)
    }

    pub fn div(&mut self, a: &LuaValue, b: &LuaValue) -> LuaResult<LuaValue> {
        self.arith(ArithOp::Div, a, b)
    }

    pub fn modulo(&mut self, a: &LuaValue, b: &LuaValue) -> LuaResult<LuaValue> {
        self.arith(ArithOp::Mod, a, b)
    }

    pub fn pow(&mut self, a: &LuaValue, b: &LuaValue) -> LuaResult<LuaValue> {
        self.arith(ArithOp::Pow, a, b)
    }

    pub fn unm(&mut self, a: &LuaValue) -> LuaResult<LuaValue> {
        self.arith(ArithOp::Unm, a, a)
    }
}
