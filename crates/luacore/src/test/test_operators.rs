// Tests for equality, ordering, concatenation, calls and number text
use super::{int, s};
use crate::lua_vm::execute;
use crate::*;

#[test]
fn test_numeric_equality_across_subtypes() {
    assert!(execute::equals(&int(1), &LuaValue::Float(1.0)).unwrap());
    assert!(!execute::equals(&int(1), &LuaValue::Float(1.5)).unwrap());
    assert!(!execute::equals(&s("1"), &int(1)).unwrap());
    assert!(!execute::equals(&LuaValue::Float(f64::NAN), &LuaValue::Float(f64::NAN)).unwrap());
}

#[test]
fn test_reference_identity() {
    let t = LuaTable::new(0, 0);
    let a = LuaValue::Table(t.clone());
    let b = LuaValue::Table(t);
    assert!(execute::equals(&a, &b).unwrap());
    assert!(!execute::equals(&a, &LuaValue::Table(LuaTable::new(0, 0))).unwrap());
}

#[test]
fn test_ordering() {
    assert!(execute::less_than(&int(1), &int(2)).unwrap());
    assert!(execute::less_than(&int(1), &LuaValue::Float(1.5)).unwrap());
    assert!(execute::less_equal(&LuaValue::Float(2.0), &int(2)).unwrap());
    assert!(execute::less_than(&s("abc"), &s("abd")).unwrap());
    assert!(execute::less_than(&s("Z"), &s("a")).unwrap());
    assert!(execute::less_than(&s(""), &s("a")).unwrap());
    assert!(!execute::less_than(&LuaValue::Float(f64::NAN), &int(1)).unwrap());
    assert!(!execute::less_equal(&LuaValue::Float(f64::NAN), &int(1)).unwrap());
}

#[test]
fn test_ordering_errors() {
    let err = execute::less_than(&int(1), &LuaValue::Nil).unwrap_err();
    assert_eq!(err.to_string(), "attempt to compare number with nil");

    let a = LuaValue::Table(LuaTable::new(0, 0));
    let b = LuaValue::Table(LuaTable::new(0, 0));
    let err = execute::less_than(&a, &b).unwrap_err();
    assert_eq!(err.to_string(), "attempt to compare two table values");

    let err = execute::less_equal(&s("1"), &int(1)).unwrap_err();
    assert_eq!(err.to_string(), "attempt to compare string with number");
}

#[test]
fn test_concat() {
    assert_eq!(execute::concat(&s("a"), &s("b")).unwrap(), s("ab"));
    assert_eq!(execute::concat(&s("n="), &int(12)).unwrap(), s("n=12"));
    assert_eq!(execute::concat(&LuaValue::Float(1.5), &s("")).unwrap(), s("1.5"));
    assert_eq!(execute::concat(&LuaValue::Float(2.0), &s("")).unwrap(), s("2.0"));
    assert_eq!(
        execute::concat_values(&[s("a"), int(1), s("b")]).unwrap(),
        s("a1b")
    );
    assert_eq!(execute::concat_values(&[]).unwrap(), s(""));

    let err = execute::concat(&LuaValue::Table(LuaTable::new(0, 0)), &s("x")).unwrap_err();
    assert_eq!(err.to_string(), "attempt to concatenate table with string");
}

#[test]
fn test_tostring_numbers() {
    assert_eq!(execute::tostring(&int(-7)).unwrap(), s("-7"));
    assert_eq!(execute::tostring(&LuaValue::Float(1.0)).unwrap(), s("1.0"));
    assert_eq!(execute::tostring(&LuaValue::Float(0.1)).unwrap(), s("0.1"));
    assert_eq!(execute::tostring(&LuaValue::Float(1e100)).unwrap(), s("1e+100"));
    assert_eq!(execute::tostring(&LuaValue::Float(f64::INFINITY)).unwrap(), s("inf"));
    assert_eq!(execute::tostring(&LuaValue::Float(f64::NEG_INFINITY)).unwrap(), s("-inf"));
    assert_eq!(execute::tostring(&LuaValue::Nil).unwrap(), s("nil"));
    assert_eq!(execute::tostring(&LuaValue::Boolean(false)).unwrap(), s("false"));
}

#[test]
fn test_call_non_callable() {
    let err = execute::call(&LuaValue::Nil, &[]).unwrap_err();
    assert_eq!(err.to_string(), "attempt to call a nil value");
}

#[test]
fn test_runaway_recursion_is_stack_overflow() {
    // f calls itself through a table slot until the depth bound trips
    let holder = LuaTable::new(0, 0);
    let slot = holder.clone();
    let f = LuaFunction::new("recurse", move |args| {
        let me = slot.raw_get_str("f");
        execute::call(&me, args)
    });
    holder.raw_set_str("f", LuaValue::Function(f.clone()));

    let err = execute::call_function(&f, &[]).unwrap_err();
    assert!(matches!(err, LuaError::StackOverflow));
    assert_eq!(err.to_string(), "stack overflow");
    // Break the holder <-> closure cycle
    holder.raw_set_str("f", LuaValue::Nil);

    // Depth accounting unwound: ordinary calls still work
    let ok = LuaFunction::from_fn("ok", |_| Ok(MultiValue::single(LuaValue::Boolean(true))));
    assert!(execute::call_function(&ok, &[]).is_ok());
}

#[test]
fn test_truthiness() {
    assert!(LuaValue::Nil.is_falsy());
    assert!(LuaValue::Boolean(false).is_falsy());
    assert!(int(0).is_truthy());
    assert!(s("").is_truthy());
}
