// Coroutine engine
//
// Each coroutine runs on its own OS thread, but only one of {resumer,
// coroutine} is ever unblocked: resume and yield are a synchronous handoff
// through one mutex + condition variable pair per coroutine.

use parking_lot::{Condvar, Mutex};
use std::cell::RefCell;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread;

use super::{LuaFunction, LuaValue, MultiValue};
use crate::lua_vm::execute::call_function;
use crate::lua_vm::{LuaError, LuaResult, SafeOption};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoroutineStatus {
    /// Created but not started, or stopped in a yield
    Suspended,
    Running,
    /// Active but not running: it resumed another coroutine
    Normal,
    Dead,
}

impl CoroutineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CoroutineStatus::Suspended => "suspended",
            CoroutineStatus::Running => "running",
            CoroutineStatus::Normal => "normal",
            CoroutineStatus::Dead => "dead",
        }
    }
}

impl fmt::Display for CoroutineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values crossing the rendezvous, in either direction.
enum Handoff {
    /// Resumer -> coroutine
    Resume(Vec<LuaValue>),
    /// Coroutine -> resumer, coroutine stays alive
    Yield(Vec<LuaValue>),
    /// Coroutine -> resumer, body returned or failed
    Finish(LuaResult<Vec<LuaValue>>),
    /// Handle dropped before the first resume; the thread exits unstarted
    Close,
}

struct Rendezvous {
    status: CoroutineStatus,
    started: bool,
    slot: Option<Handoff>,
}

struct Channel {
    state: Mutex<Rendezvous>,
    cond: Condvar,
}

impl Channel {
    /// Coroutine side: block until a resume (or close) arrives.
    fn wait_resume(&self) -> Option<Vec<LuaValue>> {
        let mut state = self.state.lock();
        loop {
            match state.slot.take() {
                Some(Handoff::Resume(args)) => return Some(args),
                Some(Handoff::Close) => return None,
                other => state.slot = other,
            }
            self.cond.wait(&mut state);
        }
    }

    /// Coroutine side: hand values to the resumer.
    fn post(&self, status: CoroutineStatus, handoff: Handoff) {
        let mut state = self.state.lock();
        state.status = status;
        state.slot = Some(handoff);
        self.cond.notify_all();
    }

    fn set_status(&self, status: CoroutineStatus) {
        self.state.lock().status = status;
    }
}

/// Coroutine handle. Identity is the handle allocation.
#[derive(Clone)]
pub struct LuaThread {
    inner: Arc<ThreadData>,
}

struct ThreadData {
    id: u64,
    channel: Arc<Channel>,
}

impl Drop for ThreadData {
    fn drop(&mut self) {
        // A coroutine that never ran can be released. One dropped inside a
        // yield stays parked: there is no way to unwind its body.
        let mut state = self.channel.state.lock();
        if !state.started && state.status == CoroutineStatus::Suspended {
            state.status = CoroutineStatus::Dead;
            state.slot = Some(Handoff::Close);
            self.channel.cond.notify_all();
        }
    }
}

/// What the execution thread of a coroutine knows about itself.
struct CoroutineContext {
    handle: Weak<ThreadData>,
    channel: Arc<Channel>,
}

thread_local! {
    /// Coroutine running on this OS thread; `None` on threads that are not
    /// coroutine bodies (the top-level thread of control)
    static CURRENT: RefCell<Option<CoroutineContext>> = const { RefCell::new(None) };
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

impl LuaThread {
    /// Create a suspended coroutine running `func`. Its execution thread is
    /// started immediately and blocks until the first resume.
    pub fn create(func: LuaFunction, options: &SafeOption) -> LuaResult<LuaThread> {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let channel = Arc::new(Channel {
            state: Mutex::new(Rendezvous {
                status: CoroutineStatus::Suspended,
                started: false,
                slot: None,
            }),
            cond: Condvar::new(),
        });
        let inner = Arc::new(ThreadData {
            id,
            channel: channel.clone(),
        });

        let context = CoroutineContext {
            handle: Arc::downgrade(&inner),
            channel,
        };
        thread::Builder::new()
            .name(format!("{}-{}", options.coroutine_thread_name, id))
            .stack_size(options.coroutine_stack_size)
            .spawn(move || run_body(id, func, context))
            .map_err(|e| {
                tracing::debug!(target: "luacore::coroutine", id, error = %e, "failed to spawn coroutine thread");
                LuaError::Coroutine(format!("cannot create coroutine: {}", e))
            })?;

        tracing::debug!(target: "luacore::coroutine", id, "coroutine created");
        Ok(LuaThread { inner })
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn status(&self) -> CoroutineStatus {
        self.inner.channel.state.lock().status
    }

    /// Run the coroutine until it yields or finishes.
    ///
    /// Returns the yielded or returned values; a failure inside the body,
    /// or resuming a coroutine that is not suspended, is an `Err`.
    pub fn resume(&self, args: Vec<LuaValue>) -> LuaResult<Vec<LuaValue>> {
        let channel = &self.inner.channel;
        {
            let mut state = channel.state.lock();
            match state.status {
                CoroutineStatus::Suspended => {}
                CoroutineStatus::Dead => {
                    return Err(LuaError::Coroutine("cannot resume dead coroutine".to_string()));
                }
                status => {
                    return Err(LuaError::Coroutine(format!("cannot resume {} coroutine", status)));
                }
            }
            state.status = CoroutineStatus::Running;
            state.started = true;
        }

        // The resumer (if itself a coroutine) is "normal" while we run
        let parent = CURRENT.with(|c| c.borrow().as_ref().map(|ctx| ctx.channel.clone()));
        if let Some(parent) = &parent {
            parent.set_status(CoroutineStatus::Normal);
        }

        tracing::trace!(target: "luacore::coroutine", id = self.inner.id, nargs = args.len(), "resume");
        let handoff = {
            let mut state = channel.state.lock();
            state.slot = Some(Handoff::Resume(args));
            channel.cond.notify_all();
            loop {
                match state.slot.take() {
                    Some(h @ (Handoff::Yield(_) | Handoff::Finish(_))) => break h,
                    other => state.slot = other,
                }
                channel.cond.wait(&mut state);
            }
        };

        if let Some(parent) = &parent {
            parent.set_status(CoroutineStatus::Running);
        }

        match handoff {
            Handoff::Yield(values) => Ok(values),
            Handoff::Finish(result) => result,
            Handoff::Resume(_) | Handoff::Close => Err(LuaError::Coroutine(
                "cannot resume dead coroutine".to_string(),
            )),
        }
    }

    /// Suspend the coroutine running on this thread, handing `values` to its
    /// resumer. Returns the arguments of the next resume.
    pub fn yield_current(values: Vec<LuaValue>) -> LuaResult<Vec<LuaValue>> {
        let channel = CURRENT
            .with(|c| c.borrow().as_ref().map(|ctx| ctx.channel.clone()))
            .ok_or_else(|| {
                LuaError::Coroutine("attempt to yield from outside a coroutine".to_string())
            })?;

        tracing::trace!(target: "luacore::coroutine", nvalues = values.len(), "yield");
        channel.post(CoroutineStatus::Suspended, Handoff::Yield(values));
        // Resumer flips the status back to running before handing off
        channel
            .wait_resume()
            .ok_or_else(|| LuaError::Coroutine("cannot resume dead coroutine".to_string()))
    }

    /// The coroutine running on this thread, if any.
    pub fn running() -> Option<LuaThread> {
        CURRENT.with(|c| {
            c.borrow()
                .as_ref()
                .and_then(|ctx| ctx.handle.upgrade())
                .map(|inner| LuaThread { inner })
        })
    }

    /// Whether code on this thread may yield.
    pub fn is_yieldable() -> bool {
        CURRENT.with(|c| c.borrow().is_some())
    }

    /// A function that resumes a fresh coroutine running `func` on each call,
    /// returning its values directly and re-raising its failures.
    pub fn wrap(func: LuaFunction, options: &SafeOption) -> LuaResult<LuaFunction> {
        let co = LuaThread::create(func, options)?;
        Ok(LuaFunction::new("wrap", move |args| {
            co.resume(args.to_vec()).map(MultiValue::multiple)
        }))
    }

    #[inline(always)]
    pub fn ptr_eq(&self, other: &LuaThread) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    #[inline(always)]
    pub fn as_ptr(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }
}

impl fmt::Debug for LuaThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LuaThread({}, {})", self.inner.id, self.status())
    }
}

/// Body of a coroutine execution thread.
fn run_body(id: u64, func: LuaFunction, context: CoroutineContext) {
    let channel = context.channel.clone();
    let Some(args) = channel.wait_resume() else {
        tracing::debug!(target: "luacore::coroutine", id, "coroutine dropped before first resume");
        return;
    };
    CURRENT.with(|c| *c.borrow_mut() = Some(context));

    let outcome = match catch_unwind(AssertUnwindSafe(|| call_function(&func, &args))) {
        Ok(Ok(values)) => {
            tracing::debug!(target: "luacore::coroutine", id, "coroutine finished");
            Ok(values.all_values())
        }
        Ok(Err(e)) => {
            tracing::debug!(target: "luacore::coroutine", id, error = %e, "coroutine failed");
            Err(e)
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!(target: "luacore::coroutine", id, %message, "coroutine body panicked");
            Err(LuaError::runtime(message))
        }
    };

    CURRENT.with(|c| c.borrow_mut().take());
    channel.post(CoroutineStatus::Dead, Handoff::Finish(outcome));
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "coroutine panicked".to_string()
    }
}
