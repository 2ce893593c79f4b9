//! Centralized runtime limits and configuration constants.
//!
//! Mirrors Lua's `luaconf.h` / `llimits.h` design. All magic numbers that
//! control table, string, pattern and coroutine behavior are collected here
//! for easy tuning.

// ===== Metamethods =====

/// Maximum number of hops followed through `__index` / `__newindex` tables
/// before the lookup is abandoned with an error.
pub const MAXTAGLOOP: usize = 100;

// ===== Strings =====

/// Maximum length for "short" strings (interned in the process-wide pool).
/// Longer strings are kept as owned buffers.
pub const LUAI_MAXSHORTLEN: usize = 40;

/// Number of slots in the per-thread direct-mapped intern cache.
/// Must be a power of two.
pub const INTERN_CACHE_SIZE: usize = 256;

/// Entry count (live or dead) at which the intern pool first drops entries
/// whose strings are gone. Later sweeps run once the pool doubles again.
pub const INTERN_SWEEP_THRESHOLD: usize = 1024;

// ===== Tables =====

/// Number of hash-part entries kept in the inline (linear scan)
/// representation before the table is promoted to a full hash map.
pub const INLINE_HASH_LIMIT: usize = 8;

/// Number of registered metatable cycles at which a cycle sweep runs
/// automatically. Rescaled to twice the survivors after every sweep.
pub const CYCLE_SWEEP_THRESHOLD: usize = 64;

// ===== Pattern Matching =====

/// Maximum number of captures in a single pattern.
/// Matches Lua's LUA_MAXCAPTURES.
pub const LUA_MAXCAPTURES: usize = 32;

/// Maximum recursion depth of the pattern matcher.
/// Matches Lua's MAXCCALLS for lstrlib.
pub const MAXCCALLS_PATTERN: usize = 200;

// ===== Calls =====

/// Default bound on nested `__call` resolution and native call depth.
pub const MAX_CALL_DEPTH: usize = 256;

// ===== Coroutines =====

/// Default stack size for the execution thread backing a coroutine.
pub const COROUTINE_STACK_SIZE: usize = 2 * 1024 * 1024;

/// Name prefix for coroutine execution threads.
pub const COROUTINE_THREAD_NAME: &str = "lua-coroutine";
