// Basic library (_G global functions)
// Implements: type, tostring, tonumber, next, pairs, ipairs, rawget, rawset,
// rawequal, rawlen, setmetatable, getmetatable, select, error, pcall, assert,
// collectgarbage
mod parse_number;

pub use parse_number::{str_to_int_base, str_to_number};

use crate::gc;
use crate::lib_registry::{LibraryModule, check_bytes, check_integer, check_table, get_arg, require_arg};
use crate::lua_value::{LuaValue, MultiValue};
use crate::lua_vm::execute::{self, NEXT};
use crate::lua_vm::{LuaError, LuaResult};

pub fn create_basic_lib() -> LibraryModule {
    crate::lib_module!("_G", {
        "type" => lua_type,
        "tostring" => lua_tostring,
        "tonumber" => lua_tonumber,
        "pairs" => lua_pairs,
        "ipairs" => lua_ipairs,
        "rawget" => lua_rawget,
        "rawset" => lua_rawset,
        "rawequal" => lua_rawequal,
        "rawlen" => lua_rawlen,
        "setmetatable" => lua_setmetatable,
        "getmetatable" => lua_getmetatable,
        "select" => lua_select,
        "error" => lua_error,
        "pcall" => lua_pcall,
        "assert" => lua_assert,
        "collectgarbage" => lua_collectgarbage,
    })
    // `pairs` hands out this same function, so `next == select(1, pairs{})`
    .with_value("next", |_| LuaValue::Function(NEXT.clone()))
    .with_value("_VERSION", |vm| vm.create_string("Lua 5.4"))
}

/// type(v) - Return the type of a value as a string
fn lua_type(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let value = require_arg(args, 1, "type")?;
    Ok(MultiValue::single(LuaValue::string(value.type_name())))
}

/// tostring(v) - Canonical text, honouring `__tostring` and `__name`
fn lua_tostring(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let value = require_arg(args, 1, "tostring")?;
    Ok(MultiValue::single(execute::tostring(value)?))
}

/// tonumber(v [, base])
fn lua_tonumber(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let value = require_arg(args, 1, "tonumber")?;

    if matches!(get_arg(args, 2), None | Some(LuaValue::Nil)) {
        let result = match value {
            LuaValue::Integer(_) | LuaValue::Float(_) => value.clone(),
            LuaValue::String(s) => str_to_number(s.as_bytes()).unwrap_or_default(),
            _ => LuaValue::Nil,
        };
        return Ok(MultiValue::single(result));
    }

    let base = check_integer(args, 2, "tonumber")?;
    if !(2..=36).contains(&base) {
        return Err(LuaError::argument(2, "tonumber", "base out of range"));
    }
    let LuaValue::String(s) = value else {
        return Err(LuaError::type_expected(1, "tonumber", "string", Some(value)));
    };
    let result = str_to_int_base(s.as_bytes(), base as u32)
        .map(LuaValue::Integer)
        .unwrap_or_default();
    Ok(MultiValue::single(result))
}

/// pairs(t) - Returns next, t, nil (or whatever `__pairs` supplies)
fn lua_pairs(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let value = require_arg(args, 1, "pairs")?;
    let (iter, state, control) = execute::pairs(value)?;
    Ok(MultiValue::multiple(vec![iter, state, control]))
}

/// ipairs(t) - Returns the integer-key iterator, t, 0
fn lua_ipairs(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let value = require_arg(args, 1, "ipairs")?;
    let (iter, state, control) = execute::ipairs(value)?;
    Ok(MultiValue::multiple(vec![iter, state, control]))
}

/// rawget(t, k) - Get without metamethods
fn lua_rawget(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let table = check_table(args, 1, "rawget")?;
    let key = require_arg(args, 2, "rawget")?;
    Ok(MultiValue::single(table.raw_get(key)))
}

/// rawset(t, k, v) - Set without metamethods
fn lua_rawset(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let table = check_table(args, 1, "rawset")?;
    let key = require_arg(args, 2, "rawset")?;
    let value = require_arg(args, 3, "rawset")?;
    table.raw_set(key, value.clone())?;
    Ok(MultiValue::single(LuaValue::Table(table.clone())))
}

/// rawequal(a, b) - Primitive equality
fn lua_rawequal(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let a = require_arg(args, 1, "rawequal")?;
    let b = require_arg(args, 2, "rawequal")?;
    Ok(MultiValue::single(LuaValue::Boolean(a.raw_equal(b))))
}

/// rawlen(v) - Length of a table or string without `__len`
fn lua_rawlen(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let value = get_arg(args, 1);
    match value.and_then(execute::raw_len) {
        Some(n) => Ok(MultiValue::single(LuaValue::Integer(n))),
        None => Err(LuaError::argument(1, "rawlen", "table or string expected")),
    }
}

/// setmetatable(t, mt) - Set or clear the metatable of a table
fn lua_setmetatable(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let table = check_table(args, 1, "setmetatable")?;
    let metatable = match get_arg(args, 2) {
        Some(LuaValue::Nil) => None,
        Some(LuaValue::Table(mt)) => Some(mt.clone()),
        other => return Err(LuaError::type_expected(2, "setmetatable", "nil or table", other)),
    };

    if let Some(current) = table.get_metatable()
        && !current.raw_get_str("__metatable").is_nil()
    {
        return Err(LuaError::runtime("cannot change a protected metatable"));
    }

    table.set_metatable(metatable);
    Ok(MultiValue::single(LuaValue::Table(table.clone())))
}

/// getmetatable(v) - The `__metatable` field if present, else the metatable
fn lua_getmetatable(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let value = require_arg(args, 1, "getmetatable")?;
    let Some(mt) = execute::get_metatable(value) else {
        return Ok(MultiValue::single(LuaValue::Nil));
    };
    let protected = mt.raw_get_str("__metatable");
    if !protected.is_nil() {
        return Ok(MultiValue::single(protected));
    }
    Ok(MultiValue::single(LuaValue::Table(mt)))
}

/// select(n, ...) - Arguments after position n, or their count for '#'
fn lua_select(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let selector = require_arg(args, 1, "select")?;
    let rest = &args[1..];

    if selector.as_bytes() == Some(&b"#"[..]) {
        return Ok(MultiValue::single(LuaValue::Integer(rest.len() as i64)));
    }

    let n = check_integer(args, 1, "select")?;
    let count = rest.len() as i64;
    let start = if n < 0 { count + n } else { n - 1 };
    if n == 0 || start < 0 {
        return Err(LuaError::argument(1, "select", "index out of range"));
    }
    let start = (start as usize).min(rest.len());
    Ok(MultiValue::multiple(rest[start..].to_vec()))
}

/// error(v) - Raise `v` as the error object
fn lua_error(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let value = get_arg(args, 1).cloned().unwrap_or_default();
    Err(LuaError::Runtime(value))
}

/// pcall(f, ...) - Call in protected mode: (true, results...) or (false, err)
fn lua_pcall(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let func = require_arg(args, 1, "pcall")?;
    match execute::call(func, &args[1..]) {
        Ok(results) => {
            let mut values = Vec::with_capacity(results.len() + 1);
            values.push(LuaValue::Boolean(true));
            values.extend(results.all_values());
            Ok(MultiValue::multiple(values))
        }
        Err(err) => Ok(MultiValue::two(LuaValue::Boolean(false), err.to_value())),
    }
}

/// assert(v [, message, ...]) - Raise if v is false or nil, else return all arguments
fn lua_assert(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let condition = require_arg(args, 1, "assert")?;
    if condition.is_truthy() {
        return Ok(MultiValue::multiple(args.to_vec()));
    }
    match get_arg(args, 2) {
        Some(message) => Err(LuaError::Runtime(message.clone())),
        None => Err(LuaError::runtime("assertion failed!")),
    }
}

/// collectgarbage([opt]) - Only "collect" is meaningful here: it sweeps
/// unreachable metatable cycles. Everything else is reclaimed on release.
fn lua_collectgarbage(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let option = match get_arg(args, 1) {
        None | Some(LuaValue::Nil) => b"collect".to_vec(),
        Some(_) => check_bytes(args, 1, "collectgarbage")?,
    };
    if option != b"collect" {
        let message = format!("invalid option '{}'", String::from_utf8_lossy(&option));
        return Err(LuaError::argument(1, "collectgarbage", message));
    }
    gc::collect_cycles();
    Ok(MultiValue::single(LuaValue::Integer(0)))
}
