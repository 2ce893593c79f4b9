// Table library
// Implements: concat, insert, remove, pack, unpack, sort

use crate::lib_registry::{LibraryModule, arg_count, check_integer, check_table, get_arg, opt_integer};
use crate::lua_value::{LuaTable, LuaValue, MultiValue};
use crate::lua_vm::execute;
use crate::lua_vm::{LuaError, LuaResult};

/// Most results `unpack` will produce
const MAX_UNPACK: i64 = 1 << 20;

pub fn create_table_lib() -> LibraryModule {
    crate::lib_module!("table", {
        "concat" => table_concat,
        "insert" => table_insert,
        "remove" => table_remove,
        "pack" => table_pack,
        "unpack" => table_unpack,
        "sort" => table_sort,
    })
}

/// `#t`, honouring `__len`
fn length_of(table: &LuaTable, func_name: &'static str) -> LuaResult<i64> {
    execute::len(&LuaValue::Table(table.clone()))?
        .as_integer()
        .ok_or_else(|| LuaError::runtime(format!("object length is not an integer (in '{}')", func_name)))
}

/// table.concat(list [, sep [, i [, j]]])
fn table_concat(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let table = check_table(args, 1, "concat")?;
    let sep = match get_arg(args, 2) {
        None | Some(LuaValue::Nil) => Vec::new(),
        Some(v) => v
            .coerce_to_bytes()
            .ok_or_else(|| LuaError::type_expected(2, "concat", "string", Some(v)))?,
    };
    let i = opt_integer(args, 3, "concat", 1)?;
    let j = match get_arg(args, 4) {
        None | Some(LuaValue::Nil) => length_of(table, "concat")?,
        Some(_) => check_integer(args, 4, "concat")?,
    };

    let target = LuaValue::Table(table.clone());
    let mut out = Vec::new();
    let mut k = i;
    while k <= j {
        let value = execute::index(&target, &LuaValue::Integer(k))?;
        let bytes = value.coerce_to_bytes().ok_or_else(|| {
            LuaError::runtime(format!(
                "invalid value (at index {}) in table for 'concat'",
                k
            ))
        })?;
        out.extend_from_slice(&bytes);
        if k < j {
            out.extend_from_slice(&sep);
        }
        // j may be i64::MAX
        match k.checked_add(1) {
            Some(next) => k = next,
            None => break,
        }
    }
    Ok(MultiValue::single(LuaValue::bytes(&out)))
}

/// table.insert(list, [pos,] value)
fn table_insert(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let table = check_table(args, 1, "insert")?;
    let n = table.len() as i64;
    match arg_count(args) {
        2 => table.push(args[1].clone()),
        3 => {
            let pos = check_integer(args, 2, "insert")?;
            // Unsigned trick: 1 <= pos <= n + 1
            if (pos as u64).wrapping_sub(1) >= (n as u64) + 1 {
                return Err(LuaError::argument(2, "insert", "position out of bounds"));
            }
            table.insert(pos, args[2].clone())?;
        }
        _ => return Err(LuaError::runtime("wrong number of arguments to 'insert'")),
    }
    Ok(MultiValue::empty())
}

/// table.remove(list [, pos]) - removed value
fn table_remove(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let table = check_table(args, 1, "remove")?;
    let n = table.len() as i64;
    let pos = opt_integer(args, 2, "remove", n)?;
    if pos != n && (pos as u64).wrapping_sub(1) > n as u64 {
        return Err(LuaError::argument(2, "remove", "position out of bounds"));
    }
    // Empty table, or the slot just past the end: nothing to shift
    if pos < 1 || pos > n {
        let value = table.raw_geti(pos);
        table.raw_seti(pos, LuaValue::Nil);
        return Ok(MultiValue::single(value));
    }
    Ok(MultiValue::single(table.remove(pos)?))
}

/// table.pack(...) - {n = select('#', ...), ...}
fn table_pack(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let table = LuaTable::from_values(args.iter().cloned());
    table.raw_set_str("n", LuaValue::Integer(args.len() as i64));
    Ok(MultiValue::single(LuaValue::Table(table)))
}

/// table.unpack(list [, i [, j]])
fn table_unpack(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let table = check_table(args, 1, "unpack")?;
    let i = opt_integer(args, 2, "unpack", 1)?;
    let j = match get_arg(args, 3) {
        None | Some(LuaValue::Nil) => length_of(table, "unpack")?,
        Some(_) => check_integer(args, 3, "unpack")?,
    };
    if i > j {
        return Ok(MultiValue::empty());
    }
    if j.saturating_sub(i) >= MAX_UNPACK {
        return Err(LuaError::runtime("too many results to unpack"));
    }
    let target = LuaValue::Table(table.clone());
    let values = (i..=j)
        .map(|k| execute::index(&target, &LuaValue::Integer(k)))
        .collect::<LuaResult<Vec<_>>>()?;
    Ok(MultiValue::multiple(values))
}

/// table.sort(list [, comp]) - Sort `list[1..#list]` in place
fn table_sort(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let table = check_table(args, 1, "sort")?;
    let comp = match get_arg(args, 2) {
        None | Some(LuaValue::Nil) => None,
        Some(f @ LuaValue::Function(_)) => Some(f.clone()),
        other => return Err(LuaError::type_expected(2, "sort", "function", other)),
    };

    let mut values = table.array_values();
    if values.len() <= 1 {
        return Ok(MultiValue::empty());
    }

    let less = |a: &LuaValue, b: &LuaValue| -> LuaResult<bool> {
        match &comp {
            Some(f) => Ok(execute::call(f, &[a.clone(), b.clone()])?.first().is_truthy()),
            None => execute::less_than(a, b),
        }
    };
    merge_sort(&mut values, less)?;

    for (i, v) in values.into_iter().enumerate() {
        table.raw_seti(i as i64 + 1, v);
    }
    Ok(MultiValue::empty())
}

/// Stable merge sort with a fallible comparator. An inconsistent
/// comparator yields some permutation, never a panic.
fn merge_sort<F>(values: &mut Vec<LuaValue>, mut less: F) -> LuaResult<()>
where
    F: FnMut(&LuaValue, &LuaValue) -> LuaResult<bool>,
{
    let mut width = 1;
    let len = values.len();
    while width < len {
        let mut merged = Vec::with_capacity(len);
        let mut start = 0;
        while start < len {
            let mid = (start + width).min(len);
            let end = (start + 2 * width).min(len);
            let (mut l, mut r) = (start, mid);
            while l < mid && r < end {
                // Take from the right only when strictly less, for stability
                if less(&values[r], &values[l])? {
                    merged.push(values[r].clone());
                    r += 1;
                } else {
                    merged.push(values[l].clone());
                    l += 1;
                }
            }
            merged.extend_from_slice(&values[l..mid]);
            merged.extend_from_slice(&values[r..end]);
            start = end;
        }
        *values = merged;
        width *= 2;
    }
    Ok(())
}
