use ahash::RandomState;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::lua_value::{LuaTable, LuaValue, WeakTable};
use crate::lua_vm::lua_limits::CYCLE_SWEEP_THRESHOLD;

/// Tables known to sit on a cycle of metatable links.
///
/// Metatable links are always owning, so a table that is its own metatable
/// (or a ring of tables that are each other's metatables) keeps itself
/// alive. Each such ring is registered here when the closing link is set,
/// and a sweep later detaches the rings nothing outside them still refers
/// to.
struct CycleRoots {
    roots: Vec<WeakTable>,
    sweep_at: usize,
}

static CYCLE_ROOTS: LazyLock<Mutex<CycleRoots>> = LazyLock::new(|| {
    Mutex::new(CycleRoots {
        roots: Vec::new(),
        sweep_at: CYCLE_SWEEP_THRESHOLD,
    })
});

// Sweeps run one at a time, so a sweep always sees the survivors of the
// previous one
static SWEEP_LOCK: Mutex<()> = Mutex::new(());

/// Whether linking `owner -> meta` closes a cycle of metatable links,
/// that is, whether `owner` is reachable from `meta` through metatables.
pub(crate) fn closes_cycle(owner: &LuaTable, meta: &LuaTable) -> bool {
    let mut seen: Vec<usize> = Vec::new();
    let mut current = meta.clone();
    loop {
        if current.ptr_eq(owner) {
            return true;
        }
        // The chain ran into a ring that does not contain `owner`
        if seen.contains(&current.as_ptr()) {
            return false;
        }
        seen.push(current.as_ptr());
        match current.get_metatable() {
            Some(next) => current = next,
            None => return false,
        }
    }
}

/// Remember `owner` as a member of a metatable cycle. Runs a sweep once
/// enough cycles have piled up.
pub(crate) fn register_cycle(owner: &LuaTable) {
    let due = {
        let mut state = CYCLE_ROOTS.lock();
        state.roots.push(owner.downgrade());
        state.roots.len() >= state.sweep_at
    };
    tracing::trace!(target: "luacore::table", "metatable cycle registered");
    if due {
        collect_cycles();
    }
}

enum Sweep {
    /// The ring was unreachable and has been detached
    Released(usize),
    /// Still referenced from outside, or its links moved since the walk
    Alive(usize),
    /// Another thread holds one of the tables right now
    Busy(usize),
    /// The root is no longer on a cycle
    Broken,
}

/// Detach every registered metatable cycle that nothing outside the cycle
/// refers to. Returns the number of tables released.
pub fn collect_cycles() -> usize {
    // Contents of released tables, dropped once every lock is let go
    let mut garbage: Vec<LuaValue> = Vec::new();
    let released = {
        let _sweeping = SWEEP_LOCK.lock();
        sweep_registered(&mut garbage)
    };
    drop(garbage);
    released
}

fn sweep_registered(garbage: &mut Vec<LuaValue>) -> usize {
    let roots = std::mem::take(&mut CYCLE_ROOTS.lock().roots);
    let mut survivors = Vec::new();
    let mut seen: HashSet<usize, RandomState> = HashSet::default();
    let mut released = 0;

    for weak in roots {
        let Some(root) = weak.upgrade() else {
            continue;
        };
        match sweep_ring(root, garbage) {
            Sweep::Released(n) => released += n,
            Sweep::Alive(key) | Sweep::Busy(key) => {
                // One entry per ring is enough
                if seen.insert(key) {
                    survivors.push(weak);
                }
            }
            Sweep::Broken => {}
        }
    }

    let remaining = {
        let mut state = CYCLE_ROOTS.lock();
        state.roots.append(&mut survivors);
        state.sweep_at = (state.roots.len() * 2).max(CYCLE_SWEEP_THRESHOLD);
        state.roots.len()
    };
    tracing::debug!(target: "luacore::table", released, remaining, "metatable cycles swept");
    released
}

/// Examine the ring through `root`. Every member is locked while its
/// references are counted, so no handle can escape the ring mid-check.
fn sweep_ring(root: LuaTable, garbage: &mut Vec<LuaValue>) -> Sweep {
    // Members in link order, exactly one handle each
    let mut members = vec![root];
    loop {
        let Some(next) = members.last().and_then(LuaTable::get_metatable) else {
            return Sweep::Broken;
        };
        if next.ptr_eq(&members[0]) {
            break;
        }
        if members.iter().any(|m| m.ptr_eq(&next)) {
            return Sweep::Broken;
        }
        members.push(next);
    }
    let key = members.iter().map(LuaTable::as_ptr).min().unwrap_or_default();

    let mut guards = Vec::with_capacity(members.len());
    for member in &members {
        match member.try_lock_for_sweep() {
            Some(guard) => guards.push(guard),
            None => return Sweep::Busy(key),
        }
    }
    for (i, guard) in guards.iter().enumerate() {
        let next = &members[(i + 1) % members.len()];
        if !guard.metatable_is(next) {
            return Sweep::Alive(key);
        }
    }

    let mut inside = vec![0usize; members.len()];
    for guard in &guards {
        guard.for_each_table(|t| {
            if let Some(i) = members.iter().position(|m| m.ptr_eq(t)) {
                inside[i] += 1;
            }
        });
    }
    // `members` itself holds one handle per table
    let reachable = members
        .iter()
        .zip(&inside)
        .any(|(m, &n)| m.strong_count() > n + 1);
    if reachable {
        return Sweep::Alive(key);
    }

    for guard in &guards {
        guard.drain_into(garbage);
    }
    Sweep::Released(members.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closes_cycle() {
        let a = LuaTable::new(0, 0);
        let b = LuaTable::new(0, 0);
        assert!(closes_cycle(&a, &a));
        assert!(!closes_cycle(&a, &b));
        b.set_metatable(Some(a.clone()));
        assert!(closes_cycle(&a, &b));
    }

    #[test]
    fn test_chain_into_foreign_ring_terminates() {
        let c = LuaTable::new(0, 0);
        let d = LuaTable::new(0, 0);
        c.set_metatable(Some(d.clone()));
        d.set_metatable(Some(c.clone()));
        let owner = LuaTable::new(0, 0);
        assert!(!closes_cycle(&owner, &c));
    }

    #[test]
    fn test_self_ring_released() {
        let t = LuaTable::new(0, 0);
        t.set_metatable(Some(t.clone()));
        t.raw_set_str("__index", LuaValue::Table(t.clone()));
        let watch = t.downgrade();

        collect_cycles();
        assert!(watch.upgrade().is_some());

        drop(t);
        collect_cycles();
        assert!(watch.upgrade().is_none());
    }

    #[test]
    fn test_ring_with_outside_user_kept() {
        let a = LuaTable::new(0, 0);
        a.set_metatable(Some(a.clone()));
        let user = LuaTable::new(0, 0);
        user.set_metatable(Some(a.clone()));
        let watch = a.downgrade();
        drop(a);

        collect_cycles();
        assert!(user.get_metatable().is_some_and(|mt| mt.ptr_eq(&watch.upgrade().unwrap())));

        drop(user);
        collect_cycles();
        assert!(watch.upgrade().is_none());
    }
}
