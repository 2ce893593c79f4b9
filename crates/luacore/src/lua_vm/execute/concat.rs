/*----------------------------------------------------------------------
  Text conversion

  - concat:   `a .. b`; strings and numbers join directly, anything else
              needs `__concat` on either operand
  - tostring: canonical text of a value, honouring `__tostring` and
              `__name`
----------------------------------------------------------------------*/

use crate::lua_value::LuaValue;
use crate::lua_vm::{LuaError, LuaResult};

use super::metamethod::{TmKind, call_tm_res, get_metamethod};

/// `a .. b`
pub fn concat(a: &LuaValue, b: &LuaValue) -> LuaResult<LuaValue> {
    if let (Some(mut left), Some(right)) = (a.coerce_to_bytes(), b.coerce_to_bytes()) {
        left.extend_from_slice(&right);
        return Ok(LuaValue::bytes(&left));
    }

    match get_metamethod(a, TmKind::Concat).or_else(|| get_metamethod(b, TmKind::Concat)) {
        Some(mm) => call_tm_res(&mm, &[a.clone(), b.clone()]),
        None => Err(LuaError::OperandMismatch {
            op: "concatenate",
            left: a.type_name(),
            right: b.type_name(),
        }),
    }
}

/// Join many values left to right with `..` semantics
pub fn concat_values(values: &[LuaValue]) -> LuaResult<LuaValue> {
    let mut iter = values.iter();
    let Some(first) = iter.next() else {
        return Ok(LuaValue::string(""));
    };
    let mut acc = first.clone();
    for v in iter {
        acc = concat(&acc, v)?;
    }
    Ok(acc)
}

/// Canonical text form of a value (the `tostring` conversion)
pub fn tostring(value: &LuaValue) -> LuaResult<LuaValue> {
    if let Some(mm) = get_metamethod(value, TmKind::ToString) {
        let result = call_tm_res(&mm, &[value.clone()])?;
        return match result {
            LuaValue::String(_) => Ok(result),
            LuaValue::Integer(_) | LuaValue::Float(_) => Ok(LuaValue::string(&result.to_string())),
            _ => Err(LuaError::runtime("'__tostring' must return a string")),
        };
    }

    match value {
        LuaValue::String(_) => Ok(value.clone()),
        LuaValue::Table(t) => {
            if let Some(LuaValue::String(name)) = get_metamethod(value, TmKind::Name) {
                let text = format!("{}: 0x{:x}", name.to_str_lossy(), t.as_ptr());
                return Ok(LuaValue::string(&text));
            }
            Ok(LuaValue::string(&value.to_string()))
        }
        _ => Ok(LuaValue::string(&value.to_string())),
    }
}
