/*----------------------------------------------------------------------
  Table access with metamethod fallback

  - index:     t[k], falling back to `__index` (table or function)
  - new_index: t[k] = v, intercepted by `__newindex` when k is absent
  - len:       #v, honouring `__len` on tables

  Chains of table-valued `__index` / `__newindex` are followed at most
  MAXTAGLOOP hops; a longer chain is an error.
----------------------------------------------------------------------*/

use crate::lua_value::LuaValue;
use crate::lua_vm::lua_limits::MAXTAGLOOP;
use crate::lua_vm::{LuaError, LuaResult};

use super::call::call;
use super::metamethod::{TmKind, call_tm_res, get_metamethod};

/// `obj[key]` with `__index` fallback
pub fn index(obj: &LuaValue, key: &LuaValue) -> LuaResult<LuaValue> {
    let mut current = obj.clone();
    for _ in 0..MAXTAGLOOP {
        let handler = match &current {
            LuaValue::Table(t) => {
                let value = t.raw_get(key);
                if !value.is_nil() {
                    return Ok(value);
                }
                match get_metamethod(&current, TmKind::Index) {
                    Some(h) => h,
                    None => return Ok(LuaValue::Nil),
                }
            }
            other => {
                return Err(LuaError::InvalidOperand {
                    op: "index",
                    kind: other.type_name(),
                });
            }
        };

        match handler {
            LuaValue::Function(_) => return call_tm_res(&handler, &[current, key.clone()]),
            next => current = next,
        }
    }
    Err(LuaError::IndexChainTooLong)
}

/// `obj[key] = value` with `__newindex` interception
pub fn new_index(obj: &LuaValue, key: &LuaValue, value: LuaValue) -> LuaResult<()> {
    let mut current = obj.clone();
    for _ in 0..MAXTAGLOOP {
        let handler = match &current {
            LuaValue::Table(t) => {
                if t.contains_key(key) {
                    return t.raw_set(key, value);
                }
                match get_metamethod(&current, TmKind::NewIndex) {
                    Some(h) => h,
                    None => return t.raw_set(key, value),
                }
            }
            other => {
                return Err(LuaError::InvalidOperand {
                    op: "index",
                    kind: other.type_name(),
                });
            }
        };

        match handler {
            LuaValue::Function(_) => {
                call(&handler, &[current, key.clone(), value])?;
                return Ok(());
            }
            next => current = next,
        }
    }
    Err(LuaError::NewIndexChainTooLong)
}

/// Field read by name
#[inline]
pub fn index_str(obj: &LuaValue, key: &str) -> LuaResult<LuaValue> {
    index(obj, &LuaValue::string(key))
}

/// `#v`: byte length of strings, `__len` or border of tables
pub fn len(value: &LuaValue) -> LuaResult<LuaValue> {
    match value {
        LuaValue::String(s) => Ok(LuaValue::Integer(s.len() as i64)),
        LuaValue::Table(t) => match get_metamethod(value, TmKind::Len) {
            Some(mm) => call_tm_res(&mm, &[value.clone()]),
            None => Ok(LuaValue::Integer(t.len() as i64)),
        },
        other => Err(LuaError::InvalidOperand {
            op: "get length of",
            kind: other.type_name(),
        }),
    }
}

/// Raw length (`rawlen`): strings and tables only
pub fn raw_len(value: &LuaValue) -> Option<i64> {
    match value {
        LuaValue::String(s) => Some(s.len() as i64),
        LuaValue::Table(t) => Some(t.len() as i64),
        _ => None,
    }
}
