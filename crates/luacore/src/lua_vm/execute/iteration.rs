// Generic iteration: `next`, `pairs`, `ipairs`
use std::sync::LazyLock;

use crate::lua_value::{LuaFunction, LuaValue, MultiValue};
use crate::lua_vm::{LuaError, LuaResult};

use super::call::call;
use super::metamethod::{TmKind, get_metamethod};
use super::table_ops::index;

/// The shared `next` function returned by `pairs`
pub static NEXT: LazyLock<LuaFunction> = LazyLock::new(|| LuaFunction::from_fn("next", lua_next));

static IPAIRS_AUX: LazyLock<LuaFunction> =
    LazyLock::new(|| LuaFunction::from_fn("ipairs_aux", ipairs_aux));

/// next(t [, k]) -> k', v' | nil
pub fn lua_next(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let table = match args.first() {
        Some(LuaValue::Table(t)) => t,
        other => return Err(LuaError::type_expected(1, "next", "table", other)),
    };
    let key = args.get(1).cloned().unwrap_or_default();
    match table.next(&key)? {
        Some((k, v)) => Ok(MultiValue::two(k, v)),
        None => Ok(MultiValue::single(LuaValue::Nil)),
    }
}

/// Iterator triple for a generic `for` over all entries.
/// `__pairs` overrides it and supplies the triple itself.
pub fn pairs(value: &LuaValue) -> LuaResult<(LuaValue, LuaValue, LuaValue)> {
    if let Some(mm) = get_metamethod(value, TmKind::Pairs) {
        let results = call(&mm, std::slice::from_ref(value))?.all_values();
        let mut results = results.into_iter();
        return Ok((
            results.next().unwrap_or_default(),
            results.next().unwrap_or_default(),
            results.next().unwrap_or_default(),
        ));
    }
    if !value.is_table() {
        return Err(LuaError::type_expected(1, "pairs", "table", Some(value)));
    }
    Ok((LuaValue::Function(NEXT.clone()), value.clone(), LuaValue::Nil))
}

/// Iterator triple over `t[1], t[2], ...` up to the first nil.
/// `__ipairs` overrides it.
pub fn ipairs(value: &LuaValue) -> LuaResult<(LuaValue, LuaValue, LuaValue)> {
    if let Some(mm) = get_metamethod(value, TmKind::IPairs) {
        let results = call(&mm, std::slice::from_ref(value))?.all_values();
        let mut results = results.into_iter();
        return Ok((
            results.next().unwrap_or_default(),
            results.next().unwrap_or_default(),
            results.next().unwrap_or_default(),
        ));
    }
    Ok((
        LuaValue::Function(IPAIRS_AUX.clone()),
        value.clone(),
        LuaValue::Integer(0),
    ))
}

/// Step of `ipairs`: (t, i) -> i + 1, t[i + 1], stopping at nil.
/// Goes through `index`, so `__index` is honoured.
fn ipairs_aux(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let target = args.first().cloned().unwrap_or_default();
    let i = args.get(1).and_then(LuaValue::as_integer).unwrap_or(0) + 1;
    let value = index(&target, &LuaValue::Integer(i))?;
    if value.is_nil() {
        Ok(MultiValue::single(LuaValue::Nil))
    } else {
        Ok(MultiValue::two(LuaValue::Integer(i), value))
    }
}

/// Drive an iterator triple to completion, calling `body` with each
/// control value and the remaining results. Stops when the first result is
/// nil or `body` returns `false`.
pub fn for_each(
    triple: (LuaValue, LuaValue, LuaValue),
    mut body: impl FnMut(&[LuaValue]) -> LuaResult<bool>,
) -> LuaResult<()> {
    let (iter, state, mut control) = triple;
    loop {
        let results = call(&iter, &[state.clone(), control])?.all_values();
        match results.first() {
            None | Some(LuaValue::Nil) => return Ok(()),
            Some(first) => control = first.clone(),
        }
        if !body(&results)? {
            return Ok(());
        }
    }
}
