// Metamethod lookup and invocation
//
// Metamethods are ordinary entries of a metatable keyed by well-known
// double-underscore names. Lookup is always raw: a metatable's own
// `__index` is never consulted while searching it.

use crate::lua_value::{LuaTable, LuaValue};
use crate::lua_vm::LuaResult;

use super::call::call;

/// Tag method kinds consulted by the core operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TmKind {
    Index,
    NewIndex,
    Len,
    Eq,
    Lt,
    Le,
    Concat,
    Call,
    Pairs,
    IPairs,
    ToString,
    Name,
    Metatable,
}

impl TmKind {
    /// Get the metamethod name
    pub const fn name(self) -> &'static str {
        match self {
            TmKind::Index => "__index",
            TmKind::NewIndex => "__newindex",
            TmKind::Len => "__len",
            TmKind::Eq => "__eq",
            TmKind::Lt => "__lt",
            TmKind::Le => "__le",
            TmKind::Concat => "__concat",
            TmKind::Call => "__call",
            TmKind::Pairs => "__pairs",
            TmKind::IPairs => "__ipairs",
            TmKind::ToString => "__tostring",
            TmKind::Name => "__name",
            TmKind::Metatable => "__metatable",
        }
    }
}

/// Get metatable for a value. Only tables carry one.
pub fn get_metatable(value: &LuaValue) -> Option<LuaTable> {
    match value {
        LuaValue::Table(t) => t.get_metatable(),
        LuaValue::Nil
        | LuaValue::Boolean(_)
        | LuaValue::Integer(_)
        | LuaValue::Float(_)
        | LuaValue::String(_)
        | LuaValue::Function(_)
        | LuaValue::Thread(_) => None,
    }
}

/// Raw lookup of metamethod `tm` on `value`'s metatable. Nil counts as absent.
pub fn get_metamethod(value: &LuaValue, tm: TmKind) -> Option<LuaValue> {
    let mt = get_metatable(value)?;
    let mm = mt.raw_get_str(tm.name());
    (!mm.is_nil()).then_some(mm)
}

/// Call a metamethod and keep its first result
pub fn call_tm_res(metamethod: &LuaValue, args: &[LuaValue]) -> LuaResult<LuaValue> {
    Ok(call(metamethod, args)?.into_first())
}

/// Try comparison metamethod (for Lt and Le), first operand first.
/// Returns Some(bool) if a metamethod was called, None if neither has one
pub fn try_comp_tm(p1: &LuaValue, p2: &LuaValue, tm: TmKind) -> LuaResult<Option<bool>> {
    let metamethod = get_metamethod(p1, tm).or_else(|| get_metamethod(p2, tm));
    match metamethod {
        Some(mm) => {
            let result = call_tm_res(&mm, &[p1.clone(), p2.clone()])?;
            Ok(Some(result.is_truthy()))
        }
        None => Ok(None),
    }
}

/// Try equality metamethod for two distinct tables.
/// Returns Some(bool) if `__eq` was called, None if neither operand has one
pub fn try_eq_tm(p1: &LuaValue, p2: &LuaValue) -> LuaResult<Option<bool>> {
    if !(p1.is_table() && p2.is_table()) {
        return Ok(None);
    }
    try_comp_tm(p1, p2, TmKind::Eq)
}
