use ahash::RandomState;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::lua_value::{LuaString, WeakString, hash_bytes};
use crate::lua_vm::lua_limits::{INTERN_CACHE_SIZE, INTERN_SWEEP_THRESHOLD, LUAI_MAXSHORTLEN};

/// Process-wide string interner.
/// - Same content returns the same allocation for as long as any handle to
///   it is alive
/// - Content hash -> candidates mapping, guarded by one mutex
/// - Entries are weak: the pool never keeps a string alive by itself
/// - Fronted by a per-thread direct-mapped cache so repeated lookups of the
///   same short keys never touch the lock
pub struct StringInterner {
    // Content hash -> pooled strings with that hash
    map: HashMap<u64, Vec<WeakString>, RandomState>,
    // Entries in `map`, including ones whose string is already gone
    count: usize,
    sweep_at: usize,
}

static INTERNER: LazyLock<Mutex<StringInterner>> =
    LazyLock::new(|| Mutex::new(StringInterner::new()));

thread_local! {
    static INTERN_CACHE: RefCell<Vec<Option<WeakString>>> =
        RefCell::new(vec![None; INTERN_CACHE_SIZE]);
}

impl StringInterner {
    pub const SHORT_STRING_LIMIT: usize = LUAI_MAXSHORTLEN;

    fn new() -> Self {
        Self {
            map: HashMap::with_capacity_and_hasher(256, RandomState::new()),
            count: 0,
            sweep_at: INTERN_SWEEP_THRESHOLD,
        }
    }

    /// Look up `bytes`, inserting it if absent. Caller holds the pool lock.
    fn intern_locked(&mut self, bytes: &[u8], hash: u64) -> LuaString {
        let bucket = self.map.entry(hash).or_default();
        let before = bucket.len();
        let mut found = None;
        // Dead entries in the bucket are dropped while scanning it
        bucket.retain(|entry| match entry.upgrade() {
            Some(s) => {
                if found.is_none() && s.len() == bytes.len() && s.as_bytes() == bytes {
                    found = Some(s);
                }
                true
            }
            None => false,
        });
        let pruned = before - bucket.len();
        self.count -= pruned;
        if let Some(s) = found {
            return s;
        }

        let s = LuaString::with_hash(bytes.into(), hash, true);
        bucket.push(s.downgrade());
        self.count += 1;
        tracing::trace!(target: "luacore::intern", len = bytes.len(), total = self.count, "interned new string");
        if self.count >= self.sweep_at {
            self.sweep();
        }
        s
    }

    /// Drop every entry whose string has been released.
    fn sweep(&mut self) {
        let before = self.count;
        self.map.retain(|_, bucket| {
            bucket.retain(WeakString::is_live);
            !bucket.is_empty()
        });
        self.count = self.map.values().map(Vec::len).sum();
        self.sweep_at = (self.count * 2).max(INTERN_SWEEP_THRESHOLD);
        tracing::debug!(
            target: "luacore::intern",
            released = before - self.count,
            live = self.count,
            "intern pool swept"
        );
    }

    /// Number of entries held by the pool. Entries for released strings
    /// count until the next sweep.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Intern a short string, or build an owned one when it is too long to
/// be worth sharing (like Lua's long strings).
pub fn intern(bytes: &[u8]) -> LuaString {
    if bytes.len() > StringInterner::SHORT_STRING_LIMIT {
        return LuaString::new(bytes);
    }

    let hash = hash_bytes(bytes);
    let slot = (hash as usize) & (INTERN_CACHE_SIZE - 1);

    // Fast path: per-thread cache hit, no lock. A slot whose string was
    // released fails to upgrade and falls through to the pool.
    let cached = INTERN_CACHE.with(|cache| {
        cache.borrow()[slot]
            .as_ref()
            .and_then(WeakString::upgrade)
            .filter(|s| s.cached_hash() == hash && s.as_bytes() == bytes)
    });
    if let Some(s) = cached {
        return s;
    }

    let s = INTERNER.lock().intern_locked(bytes, hash);
    INTERN_CACHE.with(|cache| cache.borrow_mut()[slot] = Some(s.downgrade()));
    s
}

/// Number of distinct strings currently alive in the process-wide pool.
pub fn interned_count() -> usize {
    let mut pool = INTERNER.lock();
    pool.sweep();
    pool.len()
}
