use crate::lua_value::LuaValue;

/// Array part of a table: values for keys `1..=len`, stored densely.
///
/// Holds no nils. Assigning nil to the last slot pops it; assigning nil to an
/// interior slot splits the array and hands the tail back to the caller so it
/// can be moved to the hash part.
#[derive(Default)]
pub struct LuaValueArray {
    array: Vec<LuaValue>,
}

/// Outcome of an integer-keyed write against the array part.
pub enum ArraySet {
    /// Value stored (or removed) in place
    Done,
    /// Value appended at `len + 1`; following keys may need to move in from
    /// the hash part
    Appended,
    /// Key is outside `1..=len + 1`; the value is handed back
    OutOfRange(LuaValue),
    /// An interior slot was cleared; `tail` holds the values cut from keys
    /// `first..`, which must be stored elsewhere
    Split { first: i64, tail: Vec<LuaValue> },
}

impl LuaValueArray {
    pub fn new(capacity: usize) -> Self {
        Self {
            array: Vec::with_capacity(capacity),
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.array.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    #[inline(always)]
    fn slot(&self, key: i64) -> Option<usize> {
        if key >= 1 && (key as u64) <= self.array.len() as u64 {
            Some((key - 1) as usize)
        } else {
            None
        }
    }

    #[inline]
    pub fn get(&self, key: i64) -> Option<&LuaValue> {
        self.slot(key).map(|i| &self.array[i])
    }

    #[inline]
    pub fn contains(&self, key: i64) -> bool {
        self.slot(key).is_some()
    }

    pub fn set(&mut self, key: i64, value: LuaValue) -> ArraySet {
        let len = self.array.len();
        match self.slot(key) {
            Some(i) if !value.is_nil() => {
                self.array[i] = value;
                ArraySet::Done
            }
            Some(i) if i + 1 == len => {
                self.array.pop();
                ArraySet::Done
            }
            Some(i) => {
                let tail = self.array.split_off(i + 1);
                self.array.truncate(i);
                ArraySet::Split { first: key + 1, tail }
            }
            None if key >= 1 && key as u64 == len as u64 + 1 && !value.is_nil() => {
                self.array.push(value);
                ArraySet::Appended
            }
            None => ArraySet::OutOfRange(value),
        }
    }

    /// Append without checks; `value` must not be nil.
    #[inline]
    pub fn push(&mut self, value: LuaValue) {
        debug_assert!(!value.is_nil());
        self.array.push(value);
    }

    /// Insert at 0-based `index`, shifting later elements up.
    pub fn insert(&mut self, index: usize, value: LuaValue) {
        debug_assert!(!value.is_nil());
        self.array.insert(index, value);
    }

    /// Remove at 0-based `index`, shifting later elements down.
    pub fn remove(&mut self, index: usize) -> LuaValue {
        self.array.remove(index)
    }

    /// Entry following position `index` (0-based cursor, i.e. the key of the
    /// previous entry), if any.
    #[inline]
    pub fn next_from(&self, index: usize) -> Option<(i64, &LuaValue)> {
        self.array.get(index).map(|v| (index as i64 + 1, v))
    }

    pub fn iter(&self) -> impl Iterator<Item = &LuaValue> {
        self.array.iter()
    }

    pub fn into_values(self) -> impl Iterator<Item = LuaValue> {
        self.array.into_iter()
    }
}
