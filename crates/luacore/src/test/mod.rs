// Test module organization
pub mod test_coroutine;
pub mod test_library;
pub mod test_operators;
pub mod test_table;

use crate::lua_vm::SafeOption;
use crate::*;

/// Runtime with every standard library loaded
pub(crate) fn new_vm() -> LuaVM {
    let vm = LuaVM::new(SafeOption::default());
    vm.open_stdlib(Stdlib::All).unwrap();
    vm
}

pub(crate) fn s(text: &str) -> LuaValue {
    LuaValue::string(text)
}

pub(crate) fn int(n: i64) -> LuaValue {
    LuaValue::Integer(n)
}

/// Table with `metatable` attached
pub(crate) fn with_meta(table: LuaTable, metatable: &LuaTable) -> LuaTable {
    table.set_metatable(Some(metatable.clone()));
    table
}
