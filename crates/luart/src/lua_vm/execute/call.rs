use tracing::debug;

use super::TmKind;
use crate::lua_value::{CallOutcome, LuaFunctionRef, LuaValue, MultiValue};
use crate::lua_vm::{LuaError, LuaResult, LuaVM};

impl LuaVM {
    /// Run a native function under the call depth limit
    pub fn invoke(&mut self, func: &LuaFunctionRef, args: MultiValue) -> LuaResult<CallOutcome> {
        if self.call_depth >= self.safe_option.max_call_depth {
            return Err(LuaError::StackOverflow);
        }
        self.call_depth += 1;
        let result = func.call(self, args);
        self.call_depth -= 1;
        result
    }

    /// Call any value, resolving `__call` (the callee is prepended to the
    /// arguments). Keeps the outcome channel visible to the caller.
    pub fn call_outcome(&mut self, callee: &LuaValue, args: MultiValue) -> LuaResult<CallOutcome> {
        if let LuaValue::Function(func) = callee {
            return self.invoke(func, args);
        }
        match self.get_metamethod(callee, TmKind::Call) {
            Some(LuaValue::Function(func)) => {
                let mut args = args;
                args.prepend(callee.clone());
                self.invoke(&func, args)
            }
            _ => Err(LuaError::Type(format!(
                "attempt to call a {} value",
                callee.type_name()
            ))),
        }
    }

    /// Call and return the result sequence; a substituted sequence is
    /// unwrapped and used as the result
    pub fn call(&mut self, callee: &LuaValue, args: MultiValue) -> LuaResult<MultiValue> {
        Ok(self.call_outcome(callee, args)?.into_values())
    }

    /// Call and keep only the first result
    pub fn call1(&mut self, callee: &LuaValue, args: MultiValue) -> LuaResult<LuaValue> {
        Ok(self.call(callee, args)?.first())
    }

    /// Method call `receiver:method(args)`
    pub fn mcall(
        &mut self,
        receiver: &LuaValue,
        method: &str,
        args: MultiValue,
    ) -> LuaResult<MultiValue> {
        let func = self.table_get(receiver, &LuaValue::from(method))?;
        if func.is_nil() {
            return Err(LuaError::Lookup(format!(
                "attempt to call method '{method}' (a nil value)"
            )));
        }
        let mut args = args;
        args.prepend(receiver.clone());
        self.call(&func, args)
    }

    /// Protected call: `(true, results...)` or `(false, error value)`
    pub fn pcall(&mut self, callee: &LuaValue, args: MultiValue) -> MultiValue {
        match self.call(callee, args) {
            Ok(values) => {
                let mut result = values;
                result.prepend(LuaValue::Boolean(true));
                result
            }
            Err(err) => {
                debug!(error = %err, "pcall caught error");
                MultiValue::two(LuaValue::Boolean(false), err.to_value())
            }
        }
    }

    /// Protected call whose failures pass through `handler` first
    pub fn xpcall(
        &mut self,
        callee: &LuaValue,
        handler: &LuaValue,
        args: MultiValue,
    ) -> MultiValue {
        match self.call(callee, args) {
            Ok(values) => {
                let mut result = values;
                result.prepend(LuaValue::Boolean(true));
                result
            }
            Err(err) => {
                debug!(error = %err, "xpcall caught error");
                let message = match self.call1(handler, MultiValue::single(err.to_value())) {
                    Ok(value) => value,
                    Err(handler_err) => handler_err.to_value(),
                };
                MultiValue::two(LuaValue::Boolean(false), message)
            }
        }
    }
}
