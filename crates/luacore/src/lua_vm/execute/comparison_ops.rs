/*----------------------------------------------------------------------
  Comparison Operations

  - equals:     `==`, raw equality then `__eq` for two distinct tables
  - less_than:  `<`,  numbers and strings natively, else `__lt`
  - less_equal: `<=`, numbers and strings natively, else `__le`, else
                `not (b < a)` through `__lt`
----------------------------------------------------------------------*/

use std::cmp::Ordering;

use crate::lua_value::LuaValue;
use crate::lua_vm::{LuaError, LuaResult};

use super::metamethod::{TmKind, try_comp_tm, try_eq_tm};

/// Ordering of two primitive operands, or `None` when they are not both
/// numbers or both strings. NaN compares unordered.
fn primitive_order(a: &LuaValue, b: &LuaValue) -> Option<Option<Ordering>> {
    match (a, b) {
        (LuaValue::Integer(x), LuaValue::Integer(y)) => Some(Some(x.cmp(y))),
        (LuaValue::String(x), LuaValue::String(y)) => Some(Some(x.cmp(y))),
        _ => match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => Some(x.partial_cmp(&y)),
            _ => None,
        },
    }
}

fn compare_error(a: &LuaValue, b: &LuaValue) -> LuaError {
    LuaError::OperandMismatch {
        op: "compare",
        left: a.type_name(),
        right: b.type_name(),
    }
}

/// `a == b`
pub fn equals(a: &LuaValue, b: &LuaValue) -> LuaResult<bool> {
    if a.raw_equal(b) {
        return Ok(true);
    }
    Ok(try_eq_tm(a, b)?.unwrap_or(false))
}

/// `a < b`
pub fn less_than(a: &LuaValue, b: &LuaValue) -> LuaResult<bool> {
    if let Some(order) = primitive_order(a, b) {
        return Ok(order == Some(Ordering::Less));
    }
    try_comp_tm(a, b, TmKind::Lt)?.ok_or_else(|| compare_error(a, b))
}

/// `a <= b`
pub fn less_equal(a: &LuaValue, b: &LuaValue) -> LuaResult<bool> {
    if let Some(order) = primitive_order(a, b) {
        return Ok(matches!(order, Some(Ordering::Less | Ordering::Equal)));
    }
    if let Some(result) = try_comp_tm(a, b, TmKind::Le)? {
        return Ok(result);
    }
    // Derived from __lt with the operands swapped
    match try_comp_tm(b, a, TmKind::Lt)? {
        Some(b_less_than_a) => Ok(!b_less_than_a),
        None => Err(compare_error(a, b)),
    }
}
