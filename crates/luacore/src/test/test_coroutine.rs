// Tests for coroutines: resume/yield handoff, status tracking and the
// coroutine library
use super::{int, new_vm, s};
use crate::lua_vm::SafeOption;
use crate::*;

fn body<F>(f: F) -> LuaValue
where
    F: Fn(&[LuaValue]) -> LuaResult<MultiValue> + Send + Sync + 'static,
{
    LuaValue::Function(LuaFunction::new("body", f))
}

fn create(vm: &LuaVM, f: LuaValue) -> LuaValue {
    vm.call_global("coroutine.create", &[f]).unwrap().remove(0)
}

fn resume(vm: &LuaVM, co: &LuaValue, args: &[LuaValue]) -> Vec<LuaValue> {
    let mut full = vec![co.clone()];
    full.extend_from_slice(args);
    vm.call_global("coroutine.resume", &full).unwrap()
}

fn status(vm: &LuaVM, co: &LuaValue) -> LuaValue {
    vm.call_global("coroutine.status", &[co.clone()]).unwrap().remove(0)
}

#[test]
fn test_resume_yield_sequence() {
    let vm = new_vm();
    let co = create(
        &vm,
        body(|args| {
            let a = args[0].as_integer().unwrap_or(0);
            let resumed = LuaThread::yield_current(vec![LuaValue::Integer(a + 1)])?;
            let b = resumed[0].as_integer().unwrap_or(0);
            LuaThread::yield_current(vec![LuaValue::Integer(b * 2)])?;
            Ok(MultiValue::single(LuaValue::string("done")))
        }),
    );

    assert_eq!(status(&vm, &co), s("suspended"));
    assert_eq!(resume(&vm, &co, &[int(1)]), vec![LuaValue::Boolean(true), int(2)]);
    assert_eq!(status(&vm, &co), s("suspended"));
    assert_eq!(resume(&vm, &co, &[int(10)]), vec![LuaValue::Boolean(true), int(20)]);
    assert_eq!(resume(&vm, &co, &[]), vec![LuaValue::Boolean(true), s("done")]);
    assert_eq!(status(&vm, &co), s("dead"));
}

#[test]
fn test_resume_dead_coroutine() {
    let vm = new_vm();
    let co = create(&vm, body(|_| Ok(MultiValue::empty())));
    assert_eq!(resume(&vm, &co, &[]), vec![LuaValue::Boolean(true)]);
    assert_eq!(
        resume(&vm, &co, &[]),
        vec![LuaValue::Boolean(false), s("cannot resume dead coroutine")]
    );
}

#[test]
fn test_status_inside_body_is_running() {
    let vm = new_vm();
    let co = create(
        &vm,
        body(|_| {
            let me = LuaThread::running().map(LuaValue::Thread).unwrap_or_default();
            let status = me.as_thread().map(|t| t.status().as_str()).unwrap_or("none");
            Ok(MultiValue::single(LuaValue::string(status)))
        }),
    );
    assert_eq!(resume(&vm, &co, &[]), vec![LuaValue::Boolean(true), s("running")]);
}

#[test]
fn test_resumer_is_normal_while_child_runs() {
    let vm = new_vm();
    let co = create(
        &vm,
        body(|_| {
            let outer = LuaThread::running().ok_or_else(|| LuaError::runtime("no coroutine"))?;
            let inner_body = LuaFunction::new("inner", move |_| {
                Ok(MultiValue::single(LuaValue::string(outer.status().as_str())))
            });
            let inner = LuaThread::create(inner_body, &SafeOption::default())?;
            inner.resume(Vec::new()).map(MultiValue::multiple)
        }),
    );
    assert_eq!(resume(&vm, &co, &[]), vec![LuaValue::Boolean(true), s("normal")]);
}

#[test]
fn test_resume_running_coroutine() {
    let vm = new_vm();
    let co = create(
        &vm,
        body(|_| {
            let me = LuaThread::running().ok_or_else(|| LuaError::runtime("no coroutine"))?;
            let err = me.resume(Vec::new()).unwrap_err();
            Ok(MultiValue::single(err.to_value()))
        }),
    );
    assert_eq!(
        resume(&vm, &co, &[]),
        vec![LuaValue::Boolean(true), s("cannot resume running coroutine")]
    );
}

#[test]
fn test_errors_come_back_as_false() {
    let vm = new_vm();
    let co = create(&vm, body(|_| Err(LuaError::runtime("boom"))));
    assert_eq!(resume(&vm, &co, &[]), vec![LuaValue::Boolean(false), s("boom")]);
    assert_eq!(status(&vm, &co), s("dead"));

    // error objects other than strings pass through untouched
    let co = create(&vm, body(|_| Err(LuaError::Runtime(LuaValue::Integer(42)))));
    assert_eq!(resume(&vm, &co, &[]), vec![LuaValue::Boolean(false), int(42)]);
}

#[test]
fn test_panicking_body_is_reported() {
    let vm = new_vm();
    let co = create(&vm, body(|_| panic!("body exploded")));
    assert_eq!(
        resume(&vm, &co, &[]),
        vec![LuaValue::Boolean(false), s("body exploded")]
    );
    assert_eq!(status(&vm, &co), s("dead"));
}

#[test]
fn test_yield_outside_coroutine() {
    let vm = new_vm();
    let err = vm.call_global("coroutine.yield", &[int(1)]).unwrap_err();
    assert_eq!(err.to_string(), "attempt to yield from outside a coroutine");
}

#[test]
fn test_running_and_isyieldable() {
    let vm = new_vm();
    assert_eq!(
        vm.call_global("coroutine.running", &[]).unwrap(),
        vec![LuaValue::Nil, LuaValue::Boolean(true)]
    );
    assert_eq!(
        vm.call_global("coroutine.isyieldable", &[]).unwrap(),
        vec![LuaValue::Boolean(false)]
    );

    let co = create(
        &vm,
        body(|_| {
            let running = LuaThread::running().is_some();
            Ok(MultiValue::two(
                LuaValue::Boolean(running),
                LuaValue::Boolean(LuaThread::is_yieldable()),
            ))
        }),
    );
    assert_eq!(
        resume(&vm, &co, &[]),
        vec![LuaValue::Boolean(true), LuaValue::Boolean(true), LuaValue::Boolean(true)]
    );
}

#[test]
fn test_wrap_returns_values_and_reraises() {
    let vm = new_vm();
    let counter = body(|_| {
        for i in 1..=2 {
            LuaThread::yield_current(vec![LuaValue::Integer(i)])?;
        }
        Err(LuaError::runtime("exhausted"))
    });
    let next = vm.call_global("coroutine.wrap", &[counter]).unwrap().remove(0);
    assert_eq!(vm.call(&next, &[]).unwrap(), vec![int(1)]);
    assert_eq!(vm.call(&next, &[]).unwrap(), vec![int(2)]);
    assert_eq!(vm.call(&next, &[]).unwrap_err().to_string(), "exhausted");
    assert_eq!(
        vm.call(&next, &[]).unwrap_err().to_string(),
        "cannot resume dead coroutine"
    );
}

#[test]
fn test_library_argument_checks() {
    let vm = new_vm();
    assert_eq!(
        vm.call_global("coroutine.create", &[int(1)]).unwrap_err().to_string(),
        "bad argument #1 to 'create' (function expected, got number)"
    );
    assert_eq!(
        vm.call_global("coroutine.status", &[]).unwrap_err().to_string(),
        "bad argument #1 to 'status' (coroutine expected, got no value)"
    );
}

#[test]
fn test_dropping_unstarted_coroutine() {
    let vm = new_vm();
    for _ in 0..8 {
        let co = create(&vm, body(|_| Ok(MultiValue::empty())));
        assert_eq!(status(&vm, &co), s("suspended"));
        drop(co);
    }
    // Still able to run fresh coroutines afterwards
    let co = create(&vm, body(|_| Ok(MultiValue::single(int(7)))));
    assert_eq!(resume(&vm, &co, &[]), vec![LuaValue::Boolean(true), int(7)]);
}

#[test]
fn test_coroutine_values_are_threads() {
    let vm = new_vm();
    let co = create(&vm, body(|_| Ok(MultiValue::empty())));
    assert!(co.is_thread());
    assert_eq!(vm.call_global("type", &[co]).unwrap(), vec![s("thread")]);
}
