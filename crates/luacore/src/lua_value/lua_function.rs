use std::fmt;
use std::sync::Arc;

use super::{LuaValue, MultiValue};
use crate::lua_vm::LuaResult;

/// Native function pointer callable from Lua
pub type CFunction = fn(&[LuaValue]) -> LuaResult<MultiValue>;

/// Anything that can be invoked with a sequence of values and produce a
/// sequence of results or a failure.
///
/// Implementations must be shareable across threads: a function stored in a
/// table may be invoked from inside a coroutine body, which runs on its own
/// execution thread.
pub trait Callable: Send + Sync {
    fn call(&self, args: &[LuaValue]) -> LuaResult<MultiValue>;
}

impl Callable for CFunction {
    fn call(&self, args: &[LuaValue]) -> LuaResult<MultiValue> {
        self(args)
    }
}

struct ClosureCallable<F>(F);

impl<F> Callable for ClosureCallable<F>
where
    F: Fn(&[LuaValue]) -> LuaResult<MultiValue> + Send + Sync,
{
    fn call(&self, args: &[LuaValue]) -> LuaResult<MultiValue> {
        (self.0)(args)
    }
}

/// Function value: a shared, named handle to a `Callable`.
/// Identity (for equality and as a table key) is the handle allocation.
#[derive(Clone)]
pub struct LuaFunction {
    inner: Arc<FunctionData>,
}

struct FunctionData {
    name: &'static str,
    body: Box<dyn Callable>,
}

impl LuaFunction {
    /// Wrap a native function pointer.
    pub fn from_fn(name: &'static str, f: CFunction) -> Self {
        Self::from_callable(name, f)
    }

    /// Wrap a closure; captured state must be `Send + Sync`.
    pub fn new<F>(name: &'static str, f: F) -> Self
    where
        F: Fn(&[LuaValue]) -> LuaResult<MultiValue> + Send + Sync + 'static,
    {
        Self::from_callable(name, ClosureCallable(f))
    }

    pub fn from_callable(name: &'static str, body: impl Callable + 'static) -> Self {
        LuaFunction {
            inner: Arc::new(FunctionData {
                name,
                body: Box::new(body),
            }),
        }
    }

    /// Invoke the body directly, without call-depth accounting.
    #[inline]
    pub(crate) fn invoke(&self, args: &[LuaValue]) -> LuaResult<MultiValue> {
        self.inner.body.call(args)
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    #[inline(always)]
    pub fn ptr_eq(&self, other: &LuaFunction) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    #[inline(always)]
    pub fn as_ptr(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }
}

impl fmt::Debug for LuaFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LuaFunction({})", self.inner.name)
    }
}
