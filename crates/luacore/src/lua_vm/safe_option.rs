use super::lua_limits::{COROUTINE_STACK_SIZE, COROUTINE_THREAD_NAME};

#[derive(Debug, Clone)]
pub struct SafeOption {
    /// Stack size of the thread backing each coroutine.
    pub coroutine_stack_size: usize,
    /// Name prefix given to coroutine threads; the coroutine id is appended.
    pub coroutine_thread_name: String,
}

impl Default for SafeOption {
    fn default() -> Self {
        Self {
            coroutine_stack_size: COROUTINE_STACK_SIZE,
            coroutine_thread_name: COROUTINE_THREAD_NAME.to_string(),
        }
    }
}
