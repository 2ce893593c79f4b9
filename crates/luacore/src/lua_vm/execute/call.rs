// Generic invocation: functions directly, anything else through `__call`
use std::cell::Cell;

use crate::lua_value::{LuaFunction, LuaValue, MultiValue};
use crate::lua_vm::lua_limits::{MAX_CALL_DEPTH, MAXTAGLOOP};
use crate::lua_vm::{LuaError, LuaResult};

use super::metamethod::{TmKind, get_metamethod};

thread_local! {
    /// Nesting depth of native calls on this execution thread
    static CALL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

struct DepthGuard;

impl DepthGuard {
    fn enter() -> LuaResult<DepthGuard> {
        CALL_DEPTH.with(|depth| {
            let next = depth.get() + 1;
            if next > MAX_CALL_DEPTH {
                return Err(LuaError::StackOverflow);
            }
            depth.set(next);
            Ok(DepthGuard)
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        CALL_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Invoke a function value with depth accounting
pub fn call_function(func: &LuaFunction, args: &[LuaValue]) -> LuaResult<MultiValue> {
    let _guard = DepthGuard::enter()?;
    func.invoke(args)
}

/// Invoke any value. Non-functions are called through their `__call`
/// metamethod, which receives the original value as its first argument.
pub fn call(func: &LuaValue, args: &[LuaValue]) -> LuaResult<MultiValue> {
    if let LuaValue::Function(f) = func {
        return call_function(f, args);
    }

    let mut callee = func.clone();
    let mut full_args = args.to_vec();
    for _ in 0..MAXTAGLOOP {
        let Some(handler) = get_metamethod(&callee, TmKind::Call) else {
            return Err(LuaError::InvalidOperand {
                op: "call",
                kind: callee.type_name(),
            });
        };
        full_args.insert(0, callee);
        match handler {
            LuaValue::Function(f) => return call_function(&f, &full_args),
            other => callee = other,
        }
    }
    Err(LuaError::runtime("'__call' chain too long; possible loop"))
}
