// Lua runtime core
// Values, tables with metatables, coroutines and patterns, plus the standard
// libraries built on them. There is no compiler: embedders drive the core
// through `LuaVM` and the `execute` operations.

#[cfg(test)]
mod test;

pub mod gc;
pub mod lib_registry;
pub mod lua_pattern;
pub mod lua_value;
pub mod lua_vm;
pub mod stdlib;

pub use gc::{collect_cycles, intern, interned_count};
pub use lib_registry::LibraryRegistry;
pub use lua_value::{
    Callable, CoroutineStatus, LuaFunction, LuaString, LuaTable, LuaThread, LuaValue, MultiValue,
};
pub use lua_vm::{LuaError, LuaResult, LuaVM};
pub use stdlib::Stdlib;
