// Coroutine library
// Implements: create, resume, yield, status, running, wrap, isyieldable
//
// `create` and `wrap` are built when the library loads so coroutines pick up
// the runtime's options (thread stack size and name).

use crate::lib_registry::{LibraryModule, check_function, get_arg};
use crate::lua_value::{LuaFunction, LuaThread, LuaValue, MultiValue};
use crate::lua_vm::{LuaError, LuaResult, LuaVM};

pub fn create_coroutine_lib() -> LibraryModule {
    crate::lib_module!("coroutine", {
        "resume" => coroutine_resume,
        "yield" => coroutine_yield,
        "status" => coroutine_status,
        "running" => coroutine_running,
        "isyieldable" => coroutine_isyieldable,
    })
    .with_value("create", coroutine_create)
    .with_value("wrap", coroutine_wrap)
}

fn check_thread<'a>(args: &'a [LuaValue], index: usize, func_name: &'static str) -> LuaResult<&'a LuaThread> {
    match get_arg(args, index) {
        Some(LuaValue::Thread(co)) => Ok(co),
        other => Err(LuaError::type_expected(index, func_name, "coroutine", other)),
    }
}

/// coroutine.create(f) - New suspended coroutine
fn coroutine_create(vm: &LuaVM) -> LuaValue {
    let options = vm.options().clone();
    LuaValue::Function(LuaFunction::new("create", move |args| {
        let func = check_function(args, 1, "create")?;
        Ok(MultiValue::single(LuaValue::Thread(LuaThread::create(func, &options)?)))
    }))
}

/// coroutine.wrap(f) - Function resuming a new coroutine, re-raising failures
fn coroutine_wrap(vm: &LuaVM) -> LuaValue {
    let options = vm.options().clone();
    LuaValue::Function(LuaFunction::new("wrap", move |args| {
        let func = check_function(args, 1, "wrap")?;
        Ok(MultiValue::single(LuaValue::Function(LuaThread::wrap(func, &options)?)))
    }))
}

/// coroutine.resume(co, ...) - (true, values...) or (false, message)
fn coroutine_resume(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let co = check_thread(args, 1, "resume")?;
    match co.resume(args[1..].to_vec()) {
        Ok(results) => {
            let mut values = Vec::with_capacity(results.len() + 1);
            values.push(LuaValue::Boolean(true));
            values.extend(results);
            Ok(MultiValue::multiple(values))
        }
        Err(err) => Ok(MultiValue::two(LuaValue::Boolean(false), err.to_value())),
    }
}

/// coroutine.yield(...) - Suspend the running coroutine
fn coroutine_yield(args: &[LuaValue]) -> LuaResult<MultiValue> {
    LuaThread::yield_current(args.to_vec()).map(MultiValue::multiple)
}

/// coroutine.status(co) - "suspended", "running", "normal" or "dead"
fn coroutine_status(args: &[LuaValue]) -> LuaResult<MultiValue> {
    let co = check_thread(args, 1, "status")?;
    Ok(MultiValue::single(LuaValue::string(co.status().as_str())))
}

/// coroutine.running() - (co, false) inside a coroutine, (nil, true) outside
fn coroutine_running(_args: &[LuaValue]) -> LuaResult<MultiValue> {
    Ok(match LuaThread::running() {
        Some(co) => MultiValue::two(LuaValue::Thread(co), LuaValue::Boolean(false)),
        None => MultiValue::two(LuaValue::Nil, LuaValue::Boolean(true)),
    })
}

/// coroutine.isyieldable()
fn coroutine_isyieldable(_args: &[LuaValue]) -> LuaResult<MultiValue> {
    Ok(MultiValue::single(LuaValue::Boolean(LuaThread::is_yieldable())))
}
