// Library registration
// Native functions and load-time values are grouped into named modules and
// installed into a runtime's globals, either all at once or one at a time.

use crate::lua_value::{CFunction, LuaFunction, LuaTable, LuaValue};
use crate::lua_vm::{LuaError, LuaResult, LuaVM};
use crate::stdlib;

/// Type for value initializers - functions that create values when the module loads
pub type ValueInitializer = fn(&LuaVM) -> LuaValue;

/// Entry in a library module - can be a function or a value
pub enum LibraryEntry {
    Function(CFunction),
    Value(ValueInitializer),
}

/// A library module containing multiple functions and values
pub struct LibraryModule {
    pub name: &'static str,
    pub entries: Vec<(&'static str, LibraryEntry)>,
}

impl LibraryModule {
    /// Create a new library module
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Vec::new(),
        }
    }

    /// Add a function to this library
    pub fn with_function(mut self, name: &'static str, func: CFunction) -> Self {
        self.entries.push((name, LibraryEntry::Function(func)));
        self
    }

    /// Add a value to this library
    pub fn with_value(mut self, name: &'static str, value_init: ValueInitializer) -> Self {
        self.entries.push((name, LibraryEntry::Value(value_init)));
        self
    }
}

/// Builder for creating library modules from plain functions
#[macro_export]
macro_rules! lib_module {
    ($name:expr, {
        $($item_name:expr => $item:expr),* $(,)?
    }) => {{
        let mut module = $crate::lib_registry::LibraryModule::new($name);
        $(
            module.entries.push(($item_name, $crate::lib_registry::LibraryEntry::Function($item)));
        )*
        module
    }};
}

/// Registry for the standard libraries
pub struct LibraryRegistry {
    modules: Vec<LibraryModule>, // Use Vec to preserve insertion order
}

impl LibraryRegistry {
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    pub fn register(&mut self, module: LibraryModule) {
        self.modules.push(module);
    }

    /// Load all registered libraries into a VM
    pub fn load_all(&self, vm: &LuaVM) -> LuaResult<()> {
        for module in &self.modules {
            self.load_module(vm, module)?;
        }
        Ok(())
    }

    /// Load a specific module into the VM.
    /// `_G` entries become globals; any other module becomes a global table.
    pub fn load_module(&self, vm: &LuaVM, module: &LibraryModule) -> LuaResult<()> {
        let lib_table = LuaTable::new(0, module.entries.len());

        for (name, entry) in &module.entries {
            let value = match entry {
                LibraryEntry::Function(func) => LuaValue::Function(LuaFunction::from_fn(*name, *func)),
                LibraryEntry::Value(value_init) => value_init(vm),
            };
            if module.name == "_G" {
                vm.set_global(name, value);
            } else {
                lib_table.raw_set_str(name, value);
            }
        }

        if module.name != "_G" {
            vm.set_global(module.name, LuaValue::Table(lib_table));
        }
        Ok(())
    }

    /// Get a module by name
    pub fn get_module(&self, name: &str) -> Option<&LibraryModule> {
        self.modules.iter().find(|m| m.name == name)
    }
}

impl Default for LibraryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry holding every standard library
pub fn create_standard_registry() -> LibraryRegistry {
    let mut registry = LibraryRegistry::new();
    registry.register(stdlib::basic::create_basic_lib());
    registry.register(stdlib::string::create_string_lib());
    registry.register(stdlib::table::create_table_lib());
    registry.register(stdlib::coroutine::create_coroutine_lib());
    registry
}

// ============ Argument helpers ============

/// Helper to get a specific argument
/// 1 based index
#[inline(always)]
pub fn get_arg(args: &[LuaValue], index: usize) -> Option<&LuaValue> {
    args.get(index.checked_sub(1)?)
}

/// Helper to require an argument (any value, nil included, but present)
/// 1 based index
#[inline]
pub fn require_arg<'a>(args: &'a [LuaValue], index: usize, func_name: &'static str) -> LuaResult<&'a LuaValue> {
    get_arg(args, index).ok_or_else(|| LuaError::argument(index, func_name, "value expected"))
}

/// Helper to get argument count
#[inline(always)]
pub fn arg_count(args: &[LuaValue]) -> usize {
    args.len()
}

pub fn check_table<'a>(args: &'a [LuaValue], index: usize, func_name: &'static str) -> LuaResult<&'a LuaTable> {
    match get_arg(args, index) {
        Some(LuaValue::Table(t)) => Ok(t),
        other => Err(LuaError::type_expected(index, func_name, "table", other)),
    }
}

/// Integer argument; floats with an exact integer value are accepted,
/// as are strings that convert to one.
pub fn check_integer(args: &[LuaValue], index: usize, func_name: &'static str) -> LuaResult<i64> {
    let arg = get_arg(args, index);
    match arg {
        Some(LuaValue::Integer(i)) => Ok(*i),
        Some(LuaValue::Float(_)) => arg
            .and_then(LuaValue::as_integer)
            .ok_or_else(|| LuaError::argument(index, func_name, "number has no integer representation")),
        Some(LuaValue::String(s)) => crate::stdlib::basic::str_to_number(s.as_bytes())
            .and_then(|n| n.as_integer())
            .ok_or_else(|| LuaError::type_expected(index, func_name, "number", arg)),
        other => Err(LuaError::type_expected(index, func_name, "number", other)),
    }
}

/// Optional integer argument; nil or absent gives `default`
pub fn opt_integer(args: &[LuaValue], index: usize, func_name: &'static str, default: i64) -> LuaResult<i64> {
    match get_arg(args, index) {
        None | Some(LuaValue::Nil) => Ok(default),
        Some(_) => check_integer(args, index, func_name),
    }
}

/// String argument as bytes; numbers are converted to their text form.
pub fn check_bytes(args: &[LuaValue], index: usize, func_name: &'static str) -> LuaResult<Vec<u8>> {
    let arg = get_arg(args, index);
    arg.and_then(LuaValue::coerce_to_bytes)
        .ok_or_else(|| LuaError::type_expected(index, func_name, "string", arg))
}

pub fn check_function(args: &[LuaValue], index: usize, func_name: &'static str) -> LuaResult<LuaFunction> {
    match get_arg(args, index) {
        Some(LuaValue::Function(f)) => Ok(f.clone()),
        other => Err(LuaError::type_expected(index, func_name, "function", other)),
    }
}
