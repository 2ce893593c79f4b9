use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

/// Lua string (immutable byte buffer with cached hash).
///
/// Short strings come out of the intern pool and are shared; equal interned
/// strings are the same allocation, so equality usually resolves with a
/// pointer compare. Long strings are owned buffers and compare by content.
#[derive(Clone)]
pub struct LuaString {
    inner: Arc<StringData>,
}

/// Non-owning handle held by the intern pool and the per-thread caches.
#[derive(Clone)]
pub(crate) struct WeakString(Weak<StringData>);

impl WeakString {
    #[inline]
    pub fn upgrade(&self) -> Option<LuaString> {
        self.0.upgrade().map(|inner| LuaString { inner })
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        self.0.strong_count() > 0
    }
}

struct StringData {
    hash: u64, // Keep hash first for alignment
    interned: bool,
    bytes: Box<[u8]>,
}

/// FNV-1a over raw bytes. Deterministic across threads, which the
/// per-thread intern caches rely on.
#[inline]
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325; // FNV offset basis
    for &byte in bytes {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3); // FNV prime
    }
    hash
}

impl LuaString {
    /// Owned (non-interned) string.
    pub fn new(bytes: impl Into<Box<[u8]>>) -> Self {
        let bytes = bytes.into();
        let hash = hash_bytes(&bytes);
        Self::with_hash(bytes, hash, false)
    }

    pub(crate) fn with_hash(bytes: Box<[u8]>, hash: u64, interned: bool) -> Self {
        LuaString {
            inner: Arc::new(StringData {
                hash,
                interned,
                bytes,
            }),
        }
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner.bytes
    }

    /// The content as `&str` when it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.inner.bytes).ok()
    }

    pub fn to_str_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.inner.bytes)
    }

    pub fn to_string_lossy(&self) -> String {
        self.to_str_lossy().into_owned()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.inner.bytes.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.inner.bytes.is_empty()
    }

    #[inline(always)]
    pub fn cached_hash(&self) -> u64 {
        self.inner.hash
    }

    #[inline(always)]
    pub fn is_interned(&self) -> bool {
        self.inner.interned
    }

    #[inline]
    pub(crate) fn downgrade(&self) -> WeakString {
        WeakString(Arc::downgrade(&self.inner))
    }

    /// Whether both handles share one allocation.
    #[inline(always)]
    pub fn ptr_eq(&self, other: &LuaString) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for LuaString {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        // Fast path: compare hashes first
        if self.inner.hash != other.inner.hash {
            return false;
        }
        self.inner.bytes == other.inner.bytes
    }
}

impl Eq for LuaString {}

impl PartialOrd for LuaString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LuaString {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl Hash for LuaString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Use cached hash
        state.write_u64(self.inner.hash);
    }
}

impl fmt::Debug for LuaString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_str_lossy())
    }
}

impl fmt::Display for LuaString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_str_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_strings_compare_by_content() {
        let a = LuaString::new(b"hello".to_vec());
        let b = LuaString::new(b"hello".to_vec());
        assert!(!a.ptr_eq(&b));
        assert_eq!(a, b);
        assert_eq!(a.cached_hash(), b.cached_hash());
        assert!(!a.is_interned());
    }

    #[test]
    fn test_byte_ordering() {
        let a = LuaString::new(b"abc".to_vec());
        let b = LuaString::new(b"abd".to_vec());
        let prefix = LuaString::new(b"ab".to_vec());
        assert!(a < b);
        assert!(prefix < a);
    }

    #[test]
    fn test_non_utf8_content() {
        let s = LuaString::new(vec![0xff, 0x41]);
        assert_eq!(s.len(), 2);
        assert!(s.as_str().is_none());
        assert_eq!(s.as_bytes(), &[0xff, 0x41]);
    }
}
