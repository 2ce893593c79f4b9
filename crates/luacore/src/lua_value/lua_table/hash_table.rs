use ahash::RandomState;
use std::collections::HashMap;

use crate::lua_value::LuaValue;
use crate::lua_vm::lua_limits::INLINE_HASH_LIMIT;

/// Hash part of a table.
///
/// Entries live in a node vector in insertion order. Small tables find keys
/// by linear scan; past `INLINE_HASH_LIMIT` nodes a key -> node index map is
/// built and kept in sync.
///
/// Removing a key leaves a dead node (key kept, value nil) so that a
/// traversal positioned on that key can still continue. Dead nodes are
/// compacted away when a new key is inserted and they outnumber live ones.
#[derive(Default)]
pub struct LuaHashTable {
    nodes: Vec<Node>,
    index: Option<HashMap<LuaValue, usize, RandomState>>,
    live: usize,
}

struct Node {
    key: LuaValue,
    value: LuaValue,
}

impl LuaHashTable {
    pub fn new(capacity: usize) -> Self {
        let mut table = Self {
            nodes: Vec::with_capacity(capacity),
            index: None,
            live: 0,
        };
        if capacity > INLINE_HASH_LIMIT {
            table.index = Some(HashMap::with_capacity_and_hasher(capacity, RandomState::new()));
        }
        table
    }

    /// Number of live entries
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Whether lookups go through the key index instead of a linear scan.
    #[cfg(test)]
    pub fn is_promoted(&self) -> bool {
        self.index.is_some()
    }

    /// Node position of `key`, live or dead.
    fn position(&self, key: &LuaValue) -> Option<usize> {
        match &self.index {
            Some(index) => index.get(key).copied(),
            None => self.nodes.iter().position(|n| n.key == *key),
        }
    }

    #[inline]
    pub fn get(&self, key: &LuaValue) -> Option<&LuaValue> {
        self.position(key)
            .map(|i| &self.nodes[i].value)
            .filter(|v| !v.is_nil())
    }

    #[inline]
    pub fn get_int(&self, key: i64) -> Option<&LuaValue> {
        self.get(&LuaValue::Integer(key))
    }

    #[cfg(test)]
    pub fn contains(&self, key: &LuaValue) -> bool {
        self.get(key).is_some()
    }

    /// Store `value` under an already normalized `key`. Nil removes.
    /// Returns the previous value (nil when absent).
    pub fn set(&mut self, key: LuaValue, value: LuaValue) -> LuaValue {
        if let Some(i) = self.position(&key) {
            let node = &mut self.nodes[i];
            let was_live = !node.value.is_nil();
            let old = std::mem::replace(&mut node.value, value);
            match (was_live, node.value.is_nil()) {
                (true, true) => self.live -= 1,
                (false, false) => self.live += 1,
                _ => {}
            }
            return old;
        }
        if value.is_nil() {
            return LuaValue::Nil;
        }

        if self.nodes.len() - self.live > self.live {
            self.compact();
        }
        let slot = self.nodes.len();
        if let Some(index) = &mut self.index {
            index.insert(key.clone(), slot);
        }
        self.nodes.push(Node { key, value });
        self.live += 1;
        if self.index.is_none() && self.nodes.len() > INLINE_HASH_LIMIT {
            self.promote();
        }
        LuaValue::Nil
    }

    #[cfg(test)]
    pub fn remove(&mut self, key: &LuaValue) -> LuaValue {
        if self.position(key).is_none() {
            return LuaValue::Nil;
        }
        self.set(key.clone(), LuaValue::Nil)
    }

    /// Place integer keys `first..first + values.len()` ahead of every
    /// existing node. The keys must have no node here yet.
    pub fn prepend_run(&mut self, first: i64, values: Vec<LuaValue>) {
        if values.is_empty() {
            return;
        }
        let mut nodes: Vec<Node> = values
            .into_iter()
            .zip(first..)
            .map(|(value, k)| Node {
                key: LuaValue::Integer(k),
                value,
            })
            .collect();
        self.live += nodes.len();
        nodes.append(&mut self.nodes);
        self.nodes = nodes;

        if self.index.is_some() || self.nodes.len() > INLINE_HASH_LIMIT {
            self.promote();
        }
    }

    /// Remove `key` together with its node, so a traversal can no longer be
    /// positioned on it. Returns the value it held (nil when dead or absent).
    pub fn take(&mut self, key: &LuaValue) -> LuaValue {
        let Some(i) = self.position(key) else {
            return LuaValue::Nil;
        };
        if let Some(index) = &mut self.index {
            index.remove(key);
        }
        let node = &mut self.nodes[i];
        // A nil key never matches a lookup; the node is compacted later
        node.key = LuaValue::Nil;
        let value = std::mem::take(&mut node.value);
        if !value.is_nil() {
            self.live -= 1;
        }
        value
    }

    /// Whether any node is present, dead ones included.
    #[inline(always)]
    pub fn has_nodes(&self) -> bool {
        !self.nodes.is_empty()
    }

    /// First live entry at node position `>= from`, with its position.
    pub fn next_from(&self, from: usize) -> Option<(usize, &LuaValue, &LuaValue)> {
        self.nodes
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, n)| !n.value.is_nil())
            .map(|(i, n)| (i, &n.key, &n.value))
    }

    /// Live entry following `key` in traversal order. `Err(())` when `key`
    /// is not present at all (not even as a dead node).
    #[allow(clippy::result_unit_err)]
    pub fn next_after(&self, key: &LuaValue) -> Result<Option<(&LuaValue, &LuaValue)>, ()> {
        let pos = self.position(key).ok_or(())?;
        Ok(self.next_from(pos + 1).map(|(_, k, v)| (k, v)))
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = (&LuaValue, &LuaValue)> {
        self.nodes
            .iter()
            .filter(|n| !n.value.is_nil())
            .map(|n| (&n.key, &n.value))
    }

    /// Visit every key and value held, dead nodes and index keys included.
    pub fn for_each_ref(&self, mut f: impl FnMut(&LuaValue)) {
        for node in &self.nodes {
            f(&node.key);
            f(&node.value);
        }
        if let Some(index) = &self.index {
            index.keys().for_each(f);
        }
    }

    /// Move every node's key and value into `sink`.
    pub fn into_entries(self, sink: &mut Vec<LuaValue>) {
        for node in self.nodes {
            sink.push(node.key);
            sink.push(node.value);
        }
    }

    /// Build the key index once the inline scan gets too long.
    fn promote(&mut self) {
        let mut index = HashMap::with_capacity_and_hasher(self.nodes.len() * 2, RandomState::new());
        for (i, node) in self.nodes.iter().enumerate().filter(|(_, n)| !n.key.is_nil()) {
            index.insert(node.key.clone(), i);
        }
        tracing::trace!(target: "luacore::table", entries = self.nodes.len(), "hash part promoted");
        self.index = Some(index);
    }

    /// Drop dead nodes and renumber the index.
    fn compact(&mut self) {
        self.nodes.retain(|n| !n.value.is_nil());
        if let Some(index) = &mut self.index {
            index.clear();
            for (i, node) in self.nodes.iter().enumerate() {
                index.insert(node.key.clone(), i);
            }
        }
    }
}
