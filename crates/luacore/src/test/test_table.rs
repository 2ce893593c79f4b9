// Tests for table storage: array/hash parts, keys, length and traversal
use super::{int, s};
use crate::*;

#[test]
fn test_set_nil_shrinks_length() {
    let t = LuaTable::from_values([int(1), int(2), int(3)]);
    assert_eq!(t.len(), 3);
    t.raw_seti(3, LuaValue::Nil);
    assert_eq!(t.len(), 2);
    assert!(t.raw_geti(3).is_nil());
}

#[test]
fn test_nil_in_middle_keeps_a_border() {
    let t = LuaTable::from_values([int(1), int(2), int(3)]);
    t.raw_seti(2, LuaValue::Nil);
    let n = t.len() as i64;
    assert!(n == 1 || n == 3);
    assert!(!t.raw_geti(n.max(1)).is_nil());
    assert!(t.raw_geti(n + 1).is_nil());
    // The tail is still reachable
    assert_eq!(t.raw_geti(3), int(3));
}

#[test]
fn test_out_of_order_fill_becomes_sequence() {
    let t = LuaTable::new(0, 0);
    t.raw_seti(3, s("c"));
    t.raw_seti(2, s("b"));
    assert_eq!(t.len(), 0);
    t.raw_seti(1, s("a"));
    assert_eq!(t.len(), 3);
    assert_eq!(t.array_values(), vec![s("a"), s("b"), s("c")]);
}

#[test]
fn test_float_keys_normalized() {
    let t = LuaTable::new(0, 0);
    t.raw_set(&LuaValue::Float(2.0), s("two")).unwrap();
    assert_eq!(t.raw_geti(2), s("two"));
    assert_eq!(t.raw_get(&LuaValue::Float(2.0)), s("two"));
    t.raw_set(&LuaValue::Float(2.5), s("half")).unwrap();
    assert_eq!(t.raw_get(&LuaValue::Float(2.5)), s("half"));
    assert!(t.raw_geti(3).is_nil());
}

#[test]
fn test_invalid_keys() {
    let t = LuaTable::new(0, 0);
    let err = t.raw_set(&LuaValue::Nil, int(1)).unwrap_err();
    assert_eq!(err.to_string(), "table index is nil");
    let err = t.raw_set(&LuaValue::Float(f64::NAN), int(1)).unwrap_err();
    assert_eq!(err.to_string(), "table index is NaN");
    // Reads with such keys are simply absent
    assert!(t.raw_get(&LuaValue::Nil).is_nil());
    assert!(t.raw_get(&LuaValue::Float(f64::NAN)).is_nil());
}

#[test]
fn test_assign_nil_removes() {
    let t = LuaTable::new(0, 0);
    t.raw_set_str("k", int(1));
    assert!(t.contains_key(&s("k")));
    t.raw_set_str("k", LuaValue::Nil);
    assert!(!t.contains_key(&s("k")));
    assert!(t.is_empty());
}

#[test]
fn test_hash_part_promotion() {
    let t = LuaTable::new(0, 0);
    for i in 0..40 {
        t.raw_set_str(&format!("key{}", i), int(i));
    }
    assert_eq!(t.hash_len(), 40);
    for i in (0..40).step_by(2) {
        t.raw_set_str(&format!("key{}", i), LuaValue::Nil);
    }
    assert_eq!(t.hash_len(), 20);
    for i in 0..40 {
        let v = t.raw_get_str(&format!("key{}", i));
        if i % 2 == 0 {
            assert!(v.is_nil());
        } else {
            assert_eq!(v, int(i));
        }
    }
}

#[test]
fn test_long_string_keys_compare_by_content() {
    let long = "x".repeat(100);
    let t = LuaTable::new(0, 0);
    t.raw_set(&LuaValue::bytes(long.as_bytes()), int(7)).unwrap();
    assert_eq!(t.raw_get(&LuaValue::string(&long)), int(7));
}

#[test]
fn test_other_key_kinds() {
    let t = LuaTable::new(0, 0);
    let key_table = LuaTable::new(0, 0);
    t.raw_set(&LuaValue::Boolean(true), s("yes")).unwrap();
    t.raw_set(&LuaValue::Table(key_table.clone()), s("table")).unwrap();
    t.raw_seti(-5, s("negative"));
    assert_eq!(t.raw_get(&LuaValue::Boolean(true)), s("yes"));
    assert_eq!(t.raw_get(&LuaValue::Table(key_table)), s("table"));
    assert!(t.raw_get(&LuaValue::Table(LuaTable::new(0, 0))).is_nil());
    assert_eq!(t.raw_geti(-5), s("negative"));
    assert_eq!(t.len(), 0);
}

#[test]
fn test_next_visits_every_entry() {
    let t = LuaTable::from_values([int(10), int(20)]);
    t.raw_set_str("a", int(1));
    t.raw_set_str("b", int(2));
    t.raw_seti(100, int(3));

    let mut seen = Vec::new();
    let mut key = LuaValue::Nil;
    while let Some((k, v)) = t.next(&key).unwrap() {
        seen.push(v);
        key = k;
    }
    assert_eq!(seen.len(), 5);
    // Array part first, in order
    assert_eq!(seen[0], int(10));
    assert_eq!(seen[1], int(20));
}

#[test]
fn test_next_invalid_key() {
    let t = LuaTable::new(0, 0);
    t.raw_set_str("a", int(1));
    let err = t.next(&s("missing")).unwrap_err();
    assert_eq!(err.to_string(), "invalid key to 'next'");
}

#[test]
fn test_clear_entries_while_iterating() {
    let t = LuaTable::from_values([int(1), int(2), int(3)]);
    for i in 0..10 {
        t.raw_set_str(&format!("f{}", i), int(i));
    }
    let mut visited = 0;
    for (k, _) in t.iter() {
        t.raw_set(&k, LuaValue::Nil).unwrap();
        visited += 1;
    }
    assert_eq!(visited, 13);
    assert!(t.is_empty());
}

fn visited_keys(t: &LuaTable, mut on_key: impl FnMut(&LuaValue)) -> Vec<LuaValue> {
    let mut keys = Vec::new();
    let mut key = LuaValue::Nil;
    while let Some((k, _)) = t.next(&key).unwrap() {
        on_key(&k);
        keys.push(k.clone());
        key = k;
    }
    keys
}

#[test]
fn test_clearing_array_key_from_hash_walk() {
    let t = LuaTable::from_values([int(10), int(20), int(30)]);
    t.raw_set_str("x", int(1));
    let keys = visited_keys(&t, |k| {
        if *k == s("x") {
            t.raw_seti(1, LuaValue::Nil);
        }
    });
    // The array tail moves to the hash part but is not walked twice
    assert_eq!(keys, vec![int(1), int(2), int(3), s("x")]);
    assert_eq!(t.raw_geti(2), int(20));
    assert_eq!(t.raw_geti(3), int(30));
}

#[test]
fn test_clearing_earlier_array_key_mid_walk() {
    let t = LuaTable::from_values((1..=5).map(int));
    t.raw_set_str("x", int(0));
    let keys = visited_keys(&t, |k| {
        if *k == int(3) {
            t.raw_seti(2, LuaValue::Nil);
        }
    });
    assert_eq!(keys, vec![int(1), int(2), int(3), int(4), int(5), s("x")]);
}

#[test]
fn test_key_that_left_the_hash_part_does_not_anchor_next() {
    let t = LuaTable::new(0, 0);
    t.raw_set_str("x", int(0));
    // Key 2 lives in the hash part, dies, then joins the array part
    t.raw_seti(2, s("old"));
    t.raw_seti(2, LuaValue::Nil);
    t.raw_seti(1, s("a"));
    t.raw_seti(2, s("b"));
    assert_eq!(t.len(), 2);

    let keys = visited_keys(&t, |k| {
        if *k == int(2) {
            t.raw_seti(2, LuaValue::Nil);
        }
    });
    assert_eq!(keys, vec![int(1), int(2), s("x")]);
}

#[test]
fn test_insert_and_remove() {
    let t = LuaTable::from_values([s("a"), s("c")]);
    t.insert(2, s("b")).unwrap();
    assert_eq!(t.array_values(), vec![s("a"), s("b"), s("c")]);
    t.push(s("d"));
    assert_eq!(t.len(), 4);
    assert_eq!(t.remove(1).unwrap(), s("a"));
    assert_eq!(t.array_values(), vec![s("b"), s("c"), s("d")]);
    assert!(t.insert(10, s("x")).is_err());
    assert!(t.remove(4).is_err());
}

#[test]
fn test_self_metatable_reclaimed_by_sweep() {
    let t = LuaTable::new(0, 0);
    t.set_metatable(Some(t.clone()));
    assert!(t.get_metatable().is_some_and(|mt| mt.ptr_eq(&t)));

    let watch = t.downgrade();
    collect_cycles();
    assert!(t.get_metatable().is_some_and(|mt| mt.ptr_eq(&t)));
    drop(t);
    collect_cycles();
    assert!(watch.upgrade().is_none());
}

#[test]
fn test_equal_strings_share_interned_storage() {
    let a = intern(b"shared-key");
    let b = intern(b"shared-key");
    assert!(a.ptr_eq(&b));
    assert_eq!(LuaValue::String(a), LuaValue::bytes(b"shared-key"));
}
