// Tests for the library registry, the basic library and the table library
use super::{int, new_vm, s, with_meta};
use crate::lua_vm::SafeOption;
use crate::*;

fn call(vm: &LuaVM, name: &str, args: &[LuaValue]) -> Vec<LuaValue> {
    vm.call_global(name, args).unwrap()
}

fn call_err(vm: &LuaVM, name: &str, args: &[LuaValue]) -> String {
    vm.call_global(name, args).unwrap_err().to_string()
}

fn list(values: &[i64]) -> LuaTable {
    LuaTable::from_values(values.iter().map(|&v| LuaValue::Integer(v)))
}

#[test]
fn test_open_single_library() {
    let vm = LuaVM::new(SafeOption::default());
    vm.open_stdlib(Stdlib::String).unwrap();
    assert!(vm.get_global("string").is_table());
    assert!(vm.get_global("table").is_nil());
    assert!(vm.get_global("type").is_nil());

    vm.open_stdlib(Stdlib::Basic).unwrap();
    assert!(vm.get_global("type").is_function());
    assert_eq!(vm.get_global("_VERSION"), s("Lua 5.4"));
    // _G refers back to the globals table
    let g = vm.get_global("_G");
    assert!(g.as_table().is_some_and(|t| t.ptr_eq(vm.globals())));
}

#[test]
fn test_type_and_tostring() {
    let vm = new_vm();
    assert_eq!(call(&vm, "type", &[LuaValue::Nil]), vec![s("nil")]);
    assert_eq!(call(&vm, "type", &[LuaValue::Float(1.5)]), vec![s("number")]);
    assert_eq!(call(&vm, "type", &[vm.get_global("type")]), vec![s("function")]);
    assert_eq!(
        call_err(&vm, "type", &[]),
        "bad argument #1 to 'type' (value expected)"
    );
    assert_eq!(call(&vm, "tostring", &[int(10)]), vec![s("10")]);
    assert_eq!(call(&vm, "tostring", &[LuaValue::Boolean(true)]), vec![s("true")]);
    let text = call(&vm, "tostring", &[LuaValue::Table(LuaTable::new(0, 0))]).remove(0);
    assert!(text.as_str().unwrap().starts_with("table: 0x"));
}

#[test]
fn test_tonumber() {
    let vm = new_vm();
    assert_eq!(call(&vm, "tonumber", &[s("42")]), vec![int(42)]);
    assert_eq!(call(&vm, "tonumber", &[s("  0x1F  ")]), vec![int(31)]);
    assert_eq!(call(&vm, "tonumber", &[s("1e2")]), vec![LuaValue::Float(100.0)]);
    assert_eq!(call(&vm, "tonumber", &[s("abc")]), vec![LuaValue::Nil]);
    assert_eq!(call(&vm, "tonumber", &[LuaValue::Boolean(true)]), vec![LuaValue::Nil]);
    assert_eq!(call(&vm, "tonumber", &[s("ff"), int(16)]), vec![int(255)]);
    assert_eq!(call(&vm, "tonumber", &[s("zz"), int(36)]), vec![int(1295)]);
    assert_eq!(call(&vm, "tonumber", &[s("8"), int(8)]), vec![LuaValue::Nil]);
    assert_eq!(
        call_err(&vm, "tonumber", &[s("1"), int(99)]),
        "bad argument #2 to 'tonumber' (base out of range)"
    );
}

#[test]
fn test_select() {
    let vm = new_vm();
    assert_eq!(call(&vm, "select", &[s("#"), int(1), int(2), int(3)]), vec![int(3)]);
    assert_eq!(call(&vm, "select", &[int(2), s("a"), s("b"), s("c")]), vec![s("b"), s("c")]);
    assert_eq!(call(&vm, "select", &[int(-1), s("a"), s("b")]), vec![s("b")]);
    assert_eq!(call(&vm, "select", &[int(5), s("a")]), Vec::<LuaValue>::new());
    assert_eq!(
        call_err(&vm, "select", &[int(0), s("a")]),
        "bad argument #1 to 'select' (index out of range)"
    );
}

#[test]
fn test_raw_access_bypasses_metamethods() {
    let vm = new_vm();
    let mt = LuaTable::new(0, 0);
    mt.raw_set_str("__index", LuaValue::Function(LuaFunction::new("idx", |_| {
        Ok(MultiValue::single(LuaValue::string("meta")))
    })));
    let t = LuaValue::Table(with_meta(LuaTable::new(0, 0), &mt));

    assert_eq!(execute_index(&t, "k"), s("meta"));
    assert_eq!(call(&vm, "rawget", &[t.clone(), s("k")]), vec![LuaValue::Nil]);
    call(&vm, "rawset", &[t.clone(), s("k"), int(1)]);
    assert_eq!(call(&vm, "rawget", &[t.clone(), s("k")]), vec![int(1)]);
    assert_eq!(call(&vm, "rawequal", &[t.clone(), t.clone()]), vec![LuaValue::Boolean(true)]);
    assert_eq!(call(&vm, "rawlen", &[s("abcd")]), vec![int(4)]);
    assert_eq!(
        call_err(&vm, "rawlen", &[int(1)]),
        "bad argument #1 to 'rawlen' (table or string expected)"
    );
}

fn execute_index(t: &LuaValue, key: &str) -> LuaValue {
    crate::lua_vm::execute::index_str(t, key).unwrap()
}

#[test]
fn test_metatable_protection() {
    let vm = new_vm();
    let t = LuaValue::Table(LuaTable::new(0, 0));
    let mt = LuaTable::new(0, 0);
    call(&vm, "setmetatable", &[t.clone(), LuaValue::Table(mt.clone())]);
    let got = call(&vm, "getmetatable", &[t.clone()]).remove(0);
    assert!(got.as_table().is_some_and(|m| m.ptr_eq(&mt)));

    mt.raw_set_str("__metatable", s("locked"));
    assert_eq!(call(&vm, "getmetatable", &[t.clone()]), vec![s("locked")]);
    assert_eq!(
        call_err(&vm, "setmetatable", &[t.clone(), LuaValue::Nil]),
        "cannot change a protected metatable"
    );
    assert_eq!(
        call_err(&vm, "setmetatable", &[t, int(1)]),
        "bad argument #2 to 'setmetatable' (nil or table expected, got number)"
    );
    // Strings carry no metatable
    assert_eq!(call(&vm, "getmetatable", &[s("x")]), vec![LuaValue::Nil]);
}

#[test]
fn test_pcall_and_error() {
    let vm = new_vm();
    let error_fn = vm.get_global("error");
    assert_eq!(
        call(&vm, "pcall", &[error_fn.clone(), s("oops")]),
        vec![LuaValue::Boolean(false), s("oops")]
    );

    // Non-string error objects reach the handler unchanged
    let obj = LuaValue::Table(LuaTable::new(0, 0));
    let r = call(&vm, "pcall", &[error_fn, obj.clone()]);
    assert_eq!(r[0], LuaValue::Boolean(false));
    assert!(r[1].raw_equal(&obj));

    let ok = LuaValue::Function(LuaFunction::new("ok", |args| {
        Ok(MultiValue::multiple(args.to_vec()))
    }));
    assert_eq!(
        call(&vm, "pcall", &[ok, int(1), int(2)]),
        vec![LuaValue::Boolean(true), int(1), int(2)]
    );

    // Runtime failures are caught as their message
    assert_eq!(
        call(&vm, "pcall", &[LuaValue::Nil]),
        vec![LuaValue::Boolean(false), s("attempt to call a nil value")]
    );
}

#[test]
fn test_assert() {
    let vm = new_vm();
    assert_eq!(call(&vm, "assert", &[int(1), s("unused")]), vec![int(1), s("unused")]);
    assert_eq!(call_err(&vm, "assert", &[LuaValue::Boolean(false)]), "assertion failed!");
    assert_eq!(call_err(&vm, "assert", &[LuaValue::Nil, s("custom")]), "custom");
}

#[test]
fn test_pairs_and_next_globals() {
    let vm = new_vm();
    let t = LuaValue::Table(list(&[1, 2]));
    let triple = call(&vm, "pairs", &[t.clone()]);
    assert_eq!(triple.len(), 3);
    assert!(triple[0].raw_equal(&vm.get_global("next")));

    assert_eq!(call(&vm, "next", &[t.clone()]), vec![int(1), int(1)]);
    assert_eq!(call(&vm, "next", &[t.clone(), int(2)]), vec![LuaValue::Nil]);

    let triple = call(&vm, "ipairs", &[t.clone()]);
    assert_eq!(vm.call(&triple[0], &[t, int(0)]).unwrap(), vec![int(1), int(1)]);
}

#[test]
fn test_table_concat() {
    let vm = new_vm();
    let t = LuaValue::Table(list(&[1, 2, 3]));
    assert_eq!(call(&vm, "table.concat", &[t.clone(), s(",")]), vec![s("1,2,3")]);
    assert_eq!(call(&vm, "table.concat", &[t.clone()]), vec![s("123")]);
    assert_eq!(call(&vm, "table.concat", &[t.clone(), s("-"), int(2), int(3)]), vec![s("2-3")]);
    assert_eq!(
        call(&vm, "table.concat", &[LuaValue::Table(LuaTable::new(0, 0)), s(",")]),
        vec![s("")]
    );

    let bad = LuaTable::from_values([int(1), LuaValue::Boolean(true)]);
    assert_eq!(
        call_err(&vm, "table.concat", &[LuaValue::Table(bad)]),
        "invalid value (at index 2) in table for 'concat'"
    );
}

#[test]
fn test_table_insert_and_remove() {
    let vm = new_vm();
    let t = list(&[1, 2, 3]);
    let tv = LuaValue::Table(t.clone());

    call(&vm, "table.insert", &[tv.clone(), int(4)]);
    call(&vm, "table.insert", &[tv.clone(), int(1), int(0)]);
    assert_eq!(t.array_values(), vec![int(0), int(1), int(2), int(3), int(4)]);

    assert_eq!(call(&vm, "table.remove", &[tv.clone()]), vec![int(4)]);
    assert_eq!(call(&vm, "table.remove", &[tv.clone(), int(1)]), vec![int(0)]);
    assert_eq!(t.array_values(), vec![int(1), int(2), int(3)]);

    assert_eq!(
        call_err(&vm, "table.insert", &[tv.clone(), int(9), int(1)]),
        "bad argument #2 to 'insert' (position out of bounds)"
    );
    assert_eq!(
        call_err(&vm, "table.insert", &[tv.clone()]),
        "wrong number of arguments to 'insert'"
    );
    assert_eq!(
        call_err(&vm, "table.remove", &[tv.clone(), int(7)]),
        "bad argument #2 to 'remove' (position out of bounds)"
    );

    // Removing from an empty table yields nil
    let empty = LuaValue::Table(LuaTable::new(0, 0));
    assert_eq!(call(&vm, "table.remove", &[empty]), vec![LuaValue::Nil]);
}

#[test]
fn test_table_pack_and_unpack() {
    let vm = new_vm();
    let packed = call(&vm, "table.pack", &[int(1), LuaValue::Nil, int(3)]).remove(0);
    let t = packed.as_table().unwrap();
    assert_eq!(t.raw_get_str("n"), int(3));
    assert_eq!(t.raw_geti(3), int(3));

    let t = LuaValue::Table(list(&[10, 20, 30]));
    assert_eq!(call(&vm, "table.unpack", &[t.clone()]), vec![int(10), int(20), int(30)]);
    assert_eq!(call(&vm, "table.unpack", &[t.clone(), int(2)]), vec![int(20), int(30)]);
    assert_eq!(call(&vm, "table.unpack", &[t.clone(), int(3), int(2)]), Vec::<LuaValue>::new());
    assert_eq!(
        call_err(&vm, "table.unpack", &[t, int(1), int(i64::MAX)]),
        "too many results to unpack"
    );
}

#[test]
fn test_table_sort() {
    let vm = new_vm();
    let t = list(&[5, 2, 8, 1, 9, 3]);
    call(&vm, "table.sort", &[LuaValue::Table(t.clone())]);
    assert_eq!(t.array_values(), [1, 2, 3, 5, 8, 9].map(int).to_vec());

    let descending = LuaValue::Function(LuaFunction::new("desc", |args| {
        let gt = crate::lua_vm::execute::less_than(&args[1], &args[0])?;
        Ok(MultiValue::single(LuaValue::Boolean(gt)))
    }));
    call(&vm, "table.sort", &[LuaValue::Table(t.clone()), descending]);
    assert_eq!(t.array_values(), [9, 8, 5, 3, 2, 1].map(int).to_vec());

    let words = LuaTable::from_values([s("pear"), s("apple"), s("fig")]);
    call(&vm, "table.sort", &[LuaValue::Table(words.clone())]);
    assert_eq!(words.array_values(), vec![s("apple"), s("fig"), s("pear")]);

    let mixed = LuaTable::from_values([int(1), s("x")]);
    assert!(vm.call_global("table.sort", &[LuaValue::Table(mixed)]).is_err());
    assert_eq!(
        call_err(&vm, "table.sort", &[LuaValue::Table(t), int(1)]),
        "bad argument #2 to 'sort' (function expected, got number)"
    );
}

#[test]
fn test_missing_global_call() {
    let vm = new_vm();
    assert_eq!(
        call_err(&vm, "nonexistent", &[]),
        "attempt to call a nil value (global 'nonexistent')"
    );
}

#[test]
fn test_collectgarbage_sweeps_metatable_rings() {
    let vm = new_vm();
    let ring = LuaTable::new(0, 0);
    ring.set_metatable(Some(ring.clone()));
    let watch = ring.downgrade();
    drop(ring);

    assert_eq!(call(&vm, "collectgarbage", &[]), vec![int(0)]);
    assert!(watch.upgrade().is_none());
    assert_eq!(call(&vm, "collectgarbage", &[s("collect")]), vec![int(0)]);
    assert_eq!(
        call_err(&vm, "collectgarbage", &[s("count")]),
        "bad argument #1 to 'collectgarbage' (invalid option 'count')"
    );
}
