// LuaTable - array part + hash part + metatable slot behind a reentrant lock
mod hash_table;
mod value_array;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::RefCell;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::gc::{closes_cycle, intern, register_cycle};
use crate::lua_value::LuaValue;
use crate::lua_vm::{LuaError, LuaResult};
use hash_table::LuaHashTable;
use value_array::{ArraySet, LuaValueArray};

/// Shared handle to a table.
///
/// Storage sits behind a reentrant lock: a metamethod running on the thread
/// that is already inside an operation on this table can touch it again
/// without deadlocking. The lock is only ever held for the duration of a raw
/// storage access, never across a metamethod or any other call out.
#[derive(Clone)]
pub struct LuaTable {
    inner: Arc<TableCell>,
}

pub(crate) struct TableCell {
    data: ReentrantMutex<RefCell<TableData>>,
}

/// Non-owning table handle, held by the metatable cycle registry.
#[derive(Clone)]
pub(crate) struct WeakTable(Weak<TableCell>);

impl WeakTable {
    pub fn upgrade(&self) -> Option<LuaTable> {
        self.0.upgrade().map(|inner| LuaTable { inner })
    }
}

#[derive(Default)]
struct TableData {
    /// Keys `1..=array.len()`. Kept maximal: key `array.len() + 1` never
    /// lives in the hash part, so the array length is always a border.
    array: LuaValueArray,
    hash: LuaHashTable,
    meta: Option<LuaTable>,
}

/// Table key after normalization: integer keys are split out so the array
/// part can be probed first.
enum TableKey {
    Int(i64),
    Other(LuaValue),
}

/// Validate and normalize a key for storage.
fn storage_key(key: &LuaValue) -> LuaResult<TableKey> {
    lookup_key(key).ok_or(if key.is_nil() {
        LuaError::InvalidKey("table index is nil")
    } else {
        LuaError::InvalidKey("table index is NaN")
    })
}

/// Normalize a key for lookup; `None` for keys that can never be present.
fn lookup_key(key: &LuaValue) -> Option<TableKey> {
    match key.normalize_key()? {
        LuaValue::Integer(i) => Some(TableKey::Int(i)),
        // Short strings built outside the pool are routed through it so key
        // comparisons stay pointer-cheap
        LuaValue::String(s) if !s.is_interned() => {
            Some(TableKey::Other(LuaValue::String(intern(s.as_bytes()))))
        }
        other => Some(TableKey::Other(other)),
    }
}

impl TableData {
    fn get(&self, key: &TableKey) -> Option<&LuaValue> {
        match key {
            TableKey::Int(i) => match self.array.get(*i) {
                Some(v) => Some(v),
                None => self.hash.get_int(*i),
            },
            TableKey::Other(k) => self.hash.get(k),
        }
    }

    /// Raw store. Returns displaced values so they are dropped after the
    /// borrow ends.
    fn set(&mut self, key: TableKey, value: LuaValue) -> Vec<LuaValue> {
        match key {
            TableKey::Int(i) => self.set_int(i, value),
            TableKey::Other(k) => vec![self.hash.set(k, value)],
        }
    }

    fn set_int(&mut self, key: i64, value: LuaValue) -> Vec<LuaValue> {
        match self.array.set(key, value) {
            ArraySet::Done => Vec::new(),
            ArraySet::Appended => {
                self.migrate_from_hash();
                Vec::new()
            }
            ArraySet::OutOfRange(value) => vec![self.hash.set(LuaValue::Integer(key), value)],
            // The tail goes in front of every existing hash node: a traversal
            // already in the hash part has seen those keys and must not meet
            // them again
            ArraySet::Split { first, tail } => {
                self.hash.prepend_run(first, tail);
                Vec::new()
            }
        }
    }

    /// After the array grew by one, forget any hash node for its new last
    /// key and pull the keys that now continue it out of the hash part.
    /// Keeps the rule that no hash node, live or dead, shadows an array key.
    fn migrate_from_hash(&mut self) {
        if !self.hash.has_nodes() {
            return;
        }
        self.hash.take(&LuaValue::Integer(self.array.len() as i64));
        loop {
            let next = LuaValue::Integer(self.array.len() as i64 + 1);
            let value = self.hash.take(&next);
            if value.is_nil() {
                break;
            }
            self.array.push(value);
        }
    }

    /// Every key and value held by the array and hash parts.
    fn for_each_ref(&self, mut f: impl FnMut(&LuaValue)) {
        self.array.iter().for_each(&mut f);
        self.hash.for_each_ref(&mut f);
    }

    fn next(&self, key: &LuaValue) -> LuaResult<Option<(LuaValue, LuaValue)>> {
        let invalid = || LuaError::runtime("invalid key to 'next'");
        let array_from = match key {
            LuaValue::Nil => Some(0),
            _ => match lookup_key(key) {
                Some(TableKey::Int(i)) if self.array.contains(i) => Some(i as usize),
                _ => None,
            },
        };

        let entry = match array_from {
            Some(from) => {
                if let Some((k, v)) = self.array.next_from(from) {
                    return Ok(Some((LuaValue::Integer(k), v.clone())));
                }
                self.hash.next_from(0).map(|(_, k, v)| (k, v))
            }
            None => {
                let hash_key = match lookup_key(key).ok_or_else(invalid)? {
                    TableKey::Int(i) => LuaValue::Integer(i),
                    TableKey::Other(k) => k,
                };
                match self.hash.next_after(&hash_key) {
                    Ok(entry) => entry,
                    // An array key cleared during the array walk: the array
                    // part is done, carry on with the hash part
                    Err(()) if matches!(hash_key, LuaValue::Integer(i) if i >= 1) => {
                        self.hash.next_from(0).map(|(_, k, v)| (k, v))
                    }
                    Err(()) => return Err(invalid()),
                }
            }
        };
        Ok(entry.map(|(k, v)| (k.clone(), v.clone())))
    }
}

impl LuaTable {
    /// Create a table with room for `asize` array entries and `hsize` hash
    /// entries.
    pub fn new(asize: usize, hsize: usize) -> Self {
        LuaTable {
            inner: Arc::new(TableCell {
                data: ReentrantMutex::new(RefCell::new(TableData {
                    array: LuaValueArray::new(asize),
                    hash: LuaHashTable::new(hsize),
                    meta: None,
                })),
            }),
        }
    }

    /// Sequence table `{v1, v2, ...}`; nils leave holes like a constructor.
    pub fn from_values(values: impl IntoIterator<Item = LuaValue>) -> Self {
        let values = values.into_iter();
        let table = LuaTable::new(values.size_hint().0, 0);
        for (i, v) in values.enumerate() {
            if !v.is_nil() {
                table.raw_seti(i as i64 + 1, v);
            }
        }
        table
    }

    #[inline]
    fn read<R>(&self, f: impl FnOnce(&TableData) -> R) -> R {
        let guard = self.inner.data.lock();
        let data = guard.borrow();
        f(&data)
    }

    #[inline]
    fn write<R>(&self, f: impl FnOnce(&mut TableData) -> R) -> R {
        let guard = self.inner.data.lock();
        let mut data = guard.borrow_mut();
        f(&mut data)
    }

    // ============ Raw access ============

    /// Lookup without metamethods. Absent keys (including nil/NaN) give nil.
    pub fn raw_get(&self, key: &LuaValue) -> LuaValue {
        match lookup_key(key) {
            Some(k) => self.read(|d| d.get(&k).cloned()).unwrap_or_default(),
            None => LuaValue::Nil,
        }
    }

    #[inline]
    pub fn raw_geti(&self, key: i64) -> LuaValue {
        self.read(|d| d.get(&TableKey::Int(key)).cloned()).unwrap_or_default()
    }

    #[inline]
    pub fn raw_get_str(&self, key: &str) -> LuaValue {
        self.raw_get(&LuaValue::string(key))
    }

    /// Store without metamethods. Nil removes the entry.
    pub fn raw_set(&self, key: &LuaValue, value: LuaValue) -> LuaResult<()> {
        let key = storage_key(key)?;
        let displaced = self.write(|d| d.set(key, value));
        drop(displaced);
        Ok(())
    }

    pub fn raw_seti(&self, key: i64, value: LuaValue) {
        let displaced = self.write(|d| d.set_int(key, value));
        drop(displaced);
    }

    pub fn raw_set_str(&self, key: &str, value: LuaValue) {
        let displaced = self.write(|d| d.set(TableKey::Other(LuaValue::string(key)), value));
        drop(displaced);
    }

    /// Whether `key` has a non-nil value in raw storage.
    pub fn contains_key(&self, key: &LuaValue) -> bool {
        match lookup_key(key) {
            Some(k) => self.read(|d| d.get(&k).is_some()),
            None => false,
        }
    }

    /// Border of the table: `t[n]` is non-nil and `t[n + 1]` is nil
    /// (0 when `t[1]` is nil).
    pub fn len(&self) -> usize {
        self.read(|d| d.array.len())
    }

    pub fn is_empty(&self) -> bool {
        self.read(|d| d.array.is_empty() && d.hash.is_empty())
    }

    /// Entries in the hash part, for diagnostics and tests.
    pub fn hash_len(&self) -> usize {
        self.read(|d| d.hash.len())
    }

    /// Raw traversal step: the entry after `key` (`nil` starts), array part
    /// first, then the hash part.
    pub fn next(&self, key: &LuaValue) -> LuaResult<Option<(LuaValue, LuaValue)>> {
        self.read(|d| d.next(key))
    }

    /// Iterate raw entries via `next`. Entries may be cleared while
    /// iterating; adding new keys mid-iteration has unspecified order.
    pub fn iter(&self) -> TableIter {
        TableIter {
            table: self.clone(),
            key: LuaValue::Nil,
            done: false,
        }
    }

    // ============ Sequence helpers ============

    /// Append at `len + 1`.
    pub fn push(&self, value: LuaValue) {
        let n = self.len() as i64;
        self.raw_seti(n + 1, value);
    }

    /// Insert at `pos` (1..=len+1), shifting `t[pos..=len]` up by one.
    pub fn insert(&self, pos: i64, value: LuaValue) -> LuaResult<()> {
        let n = self.len() as i64;
        if pos < 1 || pos > n + 1 {
            return Err(LuaError::runtime("position out of bounds"));
        }
        if value.is_nil() {
            for i in (pos..=n).rev() {
                let v = self.raw_geti(i);
                self.raw_seti(i + 1, v);
            }
            self.raw_seti(pos, LuaValue::Nil);
            return Ok(());
        }
        self.write(|d| {
            d.array.insert((pos - 1) as usize, value);
            d.migrate_from_hash();
        });
        Ok(())
    }

    /// Remove `t[pos]` (1..=len), shifting later elements down.
    pub fn remove(&self, pos: i64) -> LuaResult<LuaValue> {
        let n = self.len() as i64;
        if pos < 1 || pos > n {
            return Err(LuaError::runtime("position out of bounds"));
        }
        Ok(self.write(|d| d.array.remove((pos - 1) as usize)))
    }

    /// Values `t[1..=len]` in order.
    pub fn array_values(&self) -> Vec<LuaValue> {
        self.read(|d| d.array.iter().cloned().collect())
    }

    // ============ Metatable ============

    pub fn get_metatable(&self) -> Option<LuaTable> {
        self.read(|d| d.meta.clone())
    }

    #[inline]
    pub fn has_metatable(&self) -> bool {
        self.read(|d| d.meta.is_some())
    }

    /// Attach or clear the metatable. A link that closes a cycle of
    /// metatables is handed to the cycle collector, which reclaims the ring
    /// once nothing outside it is left.
    pub fn set_metatable(&self, metatable: Option<LuaTable>) {
        let cyclic = metatable.as_ref().is_some_and(|mt| closes_cycle(self, mt));
        let old = self.write(|d| std::mem::replace(&mut d.meta, metatable));
        drop(old);
        if cyclic {
            register_cycle(self);
        }
    }

    // ============ Identity ============

    #[inline(always)]
    pub fn ptr_eq(&self, other: &LuaTable) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    #[inline(always)]
    pub fn as_ptr(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    pub(crate) fn downgrade(&self) -> WeakTable {
        WeakTable(Arc::downgrade(&self.inner))
    }

    pub(crate) fn strong_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Lock the storage for a cycle sweep; `None` while another thread is
    /// using the table.
    pub(crate) fn try_lock_for_sweep(&self) -> Option<SweepGuard<'_>> {
        self.inner.data.try_lock().map(|guard| SweepGuard { guard })
    }
}

/// A table's storage, held locked by the cycle collector.
pub(crate) struct SweepGuard<'a> {
    guard: ReentrantMutexGuard<'a, RefCell<TableData>>,
}

impl SweepGuard<'_> {
    pub fn metatable_is(&self, table: &LuaTable) -> bool {
        self.guard
            .borrow()
            .meta
            .as_ref()
            .is_some_and(|mt| mt.ptr_eq(table))
    }

    /// Call `f` for every table handle the storage holds.
    pub fn for_each_table(&self, mut f: impl FnMut(&LuaTable)) {
        let data = self.guard.borrow();
        if let Some(mt) = &data.meta {
            f(mt);
        }
        data.for_each_ref(|v| {
            if let LuaValue::Table(t) = v {
                f(t);
            }
        });
    }

    /// Empty the table, moving everything it held into `sink`.
    pub fn drain_into(&self, sink: &mut Vec<LuaValue>) {
        let data = std::mem::take(&mut *self.guard.borrow_mut());
        sink.extend(data.meta.map(LuaValue::Table));
        sink.extend(data.array.into_values());
        data.hash.into_entries(sink);
    }
}

impl Default for LuaTable {
    fn default() -> Self {
        LuaTable::new(0, 0)
    }
}

impl fmt::Debug for LuaTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LuaTable(0x{:x})", self.as_ptr())
    }
}

/// Iterator over raw table entries, driven by `LuaTable::next`.
pub struct TableIter {
    table: LuaTable,
    key: LuaValue,
    done: bool,
}

impl Iterator for TableIter {
    type Item = (LuaValue, LuaValue);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.table.next(&self.key) {
            Ok(Some((k, v))) => {
                self.key = k.clone();
                Some((k, v))
            }
            Ok(None) | Err(_) => {
                self.done = true;
                None
            }
        }
    }
}
