// Lua runtime façade
// Owns the global environment and runtime options; all work is delegated to
// the value model and the `execute` operations.
pub mod execute;
mod lua_error;
pub mod lua_limits;
mod safe_option;

use crate::gc;
use crate::lib_registry;
use crate::lua_value::{CFunction, LuaFunction, LuaTable, LuaThread, LuaValue};
use crate::stdlib::Stdlib;
pub use lua_error::LuaError;
pub use safe_option::SafeOption;

pub type LuaResult<T> = Result<T, LuaError>;

pub struct LuaVM {
    // Global environment table (_G points to this)
    globals: LuaTable,

    options: SafeOption,
}

impl LuaVM {
    pub fn new(options: SafeOption) -> Self {
        let globals = LuaTable::new(0, 64);
        globals.raw_set_str("_G", LuaValue::Table(globals.clone()));
        LuaVM { globals, options }
    }

    pub fn options(&self) -> &SafeOption {
        &self.options
    }

    /// Register a standard library (or all of them) into the globals.
    pub fn open_stdlib(&self, lib: Stdlib) -> LuaResult<()> {
        let registry = lib_registry::create_standard_registry();
        match lib {
            Stdlib::All => registry.load_all(self),
            other => match registry.get_module(other.module_name()) {
                Some(module) => registry.load_module(self, module),
                None => Ok(()),
            },
        }
    }

    pub fn globals(&self) -> &LuaTable {
        &self.globals
    }

    pub fn get_global(&self, name: &str) -> LuaValue {
        self.globals.raw_get_str(name)
    }

    pub fn set_global(&self, name: &str, value: LuaValue) {
        self.globals.raw_set_str(name, value);
    }

    /// Call any callable value and collect its results.
    pub fn call(&self, func: &LuaValue, args: &[LuaValue]) -> LuaResult<Vec<LuaValue>> {
        Ok(execute::call(func, args)?.all_values())
    }

    /// Call a function reached from the globals by a dotted path, such as
    /// `"string.gsub"`.
    pub fn call_global(&self, path: &str, args: &[LuaValue]) -> LuaResult<Vec<LuaValue>> {
        let mut target = LuaValue::Table(self.globals.clone());
        for segment in path.split('.') {
            target = execute::index_str(&target, segment)?;
        }
        if target.is_nil() {
            return Err(LuaError::runtime(format!("attempt to call a nil value (global '{}')", path)));
        }
        self.call(&target, args)
    }

    /// Reclaim tables kept alive only by metatable cycles. Returns the
    /// number of tables released.
    pub fn collect_garbage(&self) -> usize {
        gc::collect_cycles()
    }

    // ============ Object creation ============

    pub fn create_table(&self, array_size: usize, hash_size: usize) -> LuaValue {
        LuaValue::Table(LuaTable::new(array_size, hash_size))
    }

    pub fn create_string(&self, s: &str) -> LuaValue {
        LuaValue::string(s)
    }

    pub fn create_function(&self, name: &'static str, f: CFunction) -> LuaValue {
        LuaValue::Function(LuaFunction::from_fn(name, f))
    }

    /// New suspended coroutine, configured from this runtime's options.
    pub fn create_thread(&self, func: LuaFunction) -> LuaResult<LuaValue> {
        Ok(LuaValue::Thread(LuaThread::create(func, &self.options)?))
    }
}

impl Default for LuaVM {
    fn default() -> Self {
        Self::new(SafeOption::default())
    }
}
