// Lua value model
//
// - LuaValue: the closed set of value kinds
// - LuaString: immutable byte strings with cached hash
// - LuaTable: array part + hash part + optional metatable
// - LuaFunction: named handle to anything implementing `Callable`
// - LuaThread: coroutine handle

mod lua_function;
mod lua_string;
mod lua_table;
mod lua_thread;
#[allow(clippy::module_inception)]
mod lua_value;

pub use lua_function::{CFunction, Callable, LuaFunction};
pub use lua_string::{LuaString, hash_bytes};
pub(crate) use lua_string::WeakString;
pub use lua_table::{LuaTable, TableIter};
pub(crate) use lua_table::WeakTable;
pub use lua_thread::{CoroutineStatus, LuaThread};
pub use lua_value::{LuaValue, LuaValueKind, float_to_integer, lua_float_to_string};

/// Multiple return values
#[derive(Debug, Clone, Default)]
pub enum MultiValue {
    #[default]
    Empty,
    Single(LuaValue),
    Many(Vec<LuaValue>),
}

impl MultiValue {
    #[inline(always)]
    pub fn empty() -> Self {
        MultiValue::Empty
    }

    #[inline(always)]
    pub fn single(value: LuaValue) -> Self {
        MultiValue::Single(value)
    }

    #[inline(always)]
    pub fn two(v1: LuaValue, v2: LuaValue) -> Self {
        MultiValue::Many(vec![v1, v2])
    }

    pub fn multiple(mut values: Vec<LuaValue>) -> Self {
        match values.len() {
            0 => MultiValue::Empty,
            1 => match values.pop() {
                Some(v) => MultiValue::Single(v),
                None => MultiValue::Empty,
            },
            _ => MultiValue::Many(values),
        }
    }

    #[inline(always)]
    pub fn all_values(self) -> Vec<LuaValue> {
        match self {
            MultiValue::Empty => Vec::new(),
            MultiValue::Single(v) => vec![v],
            MultiValue::Many(v) => v,
        }
    }

    /// Get count of return values (no allocation)
    #[inline(always)]
    pub fn len(&self) -> usize {
        match self {
            MultiValue::Empty => 0,
            MultiValue::Single(_) => 1,
            MultiValue::Many(v) => v.len(),
        }
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get value at index (0-based)
    #[inline(always)]
    pub fn get(&self, index: usize) -> Option<&LuaValue> {
        match self {
            MultiValue::Empty => None,
            MultiValue::Single(v) => (index == 0).then_some(v),
            MultiValue::Many(v) => v.get(index),
        }
    }

    /// First value, or nil when there is none (Lua's single-value adjust)
    #[inline]
    pub fn first(&self) -> LuaValue {
        self.get(0).cloned().unwrap_or_default()
    }

    /// Consume and keep only the first value
    pub fn into_first(self) -> LuaValue {
        match self {
            MultiValue::Empty => LuaValue::Nil,
            MultiValue::Single(v) => v,
            MultiValue::Many(v) => v.into_iter().next().unwrap_or_default(),
        }
    }
}

impl From<LuaValue> for MultiValue {
    fn from(v: LuaValue) -> Self {
        MultiValue::Single(v)
    }
}

impl From<Vec<LuaValue>> for MultiValue {
    fn from(values: Vec<LuaValue>) -> Self {
        MultiValue::multiple(values)
    }
}
