use crate::{Error, OrderedMap};

fn assert_index_consistent(map: &OrderedMap<String, i32>) {
    for (i, key) in map.keys().enumerate() {
        assert_eq!(map.index_of(key.as_str()), Some(i), "key {key} at {i}");
    }
    assert_eq!(map.keys().len(), map.values().len());
}

#[test]
fn add_keeps_insertion_order_and_lookup() {
    let mut map = OrderedMap::new();
    map.add("c".to_string(), 3).unwrap();
    map.add("a".to_string(), 1).unwrap();
    map.add("b".to_string(), 2).unwrap();

    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
    assert_eq!(keys, ["c", "a", "b"]);
    assert_eq!(map.get("a"), Some(&1));
    assert_eq!(map.index_of("b"), Some(2));
    assert_eq!(map.value_at(0), Some(&3));
    assert_eq!(map.get_index(1), Some((&"a".to_string(), &1)));
    assert!(map.contains_key("c"));
    assert!(!map.contains_key("z"));
}

#[test]
fn add_rejects_duplicate_without_modifying() {
    let mut map = OrderedMap::new();
    map.add("a".to_string(), 1).unwrap();
    let version = map.version();

    let err = map.add("a".to_string(), 2).unwrap_err();
    assert!(matches!(err, Error::DuplicateKey { index: 0 }));
    assert_eq!(map.len(), 1);
    assert_eq!(map.get("a"), Some(&1));
    assert_eq!(map.version(), version);
}

#[test]
fn insert_shifts_following_positions() {
    let mut map: OrderedMap<String, i32> = ["a", "b", "c"]
        .into_iter()
        .enumerate()
        .map(|(i, k)| (k.to_string(), i as i32))
        .collect();

    map.insert(1, "x".to_string(), 10).unwrap();
    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
    assert_eq!(keys, ["a", "x", "b", "c"]);
    assert_index_consistent(&map);

    map.insert(4, "end".to_string(), 11).unwrap();
    assert_eq!(map.index_of("end"), Some(4));

    let err = map.insert(9, "far".to_string(), 0).unwrap_err();
    assert!(matches!(err, Error::IndexOutOfRange { index: 9, len: 5 }));
    let err = map.insert(0, "b".to_string(), 0).unwrap_err();
    assert!(matches!(err, Error::DuplicateKey { index: 2 }));
}

#[test]
fn remove_at_renumbers_and_returns_pair() {
    let mut map: OrderedMap<String, i32> = ["a", "b", "c", "d"]
        .into_iter()
        .map(|k| (k.to_string(), k.len() as i32))
        .collect();

    let (key, value) = map.remove_at(1).unwrap();
    assert_eq!(key, "b");
    assert_eq!(value, 1);
    assert_eq!(map.index_of("b"), None);
    assert_eq!(map.index_of("c"), Some(1));
    assert_index_consistent(&map);

    assert_eq!(map.remove("d"), Some(1));
    assert_eq!(map.remove("d"), None);
    assert!(matches!(
        map.remove_at(5),
        Err(Error::IndexOutOfRange { index: 5, len: 2 })
    ));
}

#[test]
fn set_upserts_in_place() {
    let mut map = OrderedMap::new();
    assert_eq!(map.set("a".to_string(), 1), None);
    assert_eq!(map.set("b".to_string(), 2), None);
    assert_eq!(map.set("a".to_string(), 3), Some(1));

    let entries: Vec<(&str, i32)> = map.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    assert_eq!(entries, [("a", 3), ("b", 2)]);
}

#[test]
fn set_at_replaces_entry_and_rekeys() {
    let mut map: OrderedMap<String, i32> = [("a".to_string(), 1), ("b".to_string(), 2)]
        .into_iter()
        .collect();

    let old = map.set_at(0, "z".to_string(), 26).unwrap();
    assert_eq!(old, ("a".to_string(), 1));
    assert_eq!(map.index_of("a"), None);
    assert_eq!(map.index_of("z"), Some(0));

    // Same key at the same index is a plain value replacement.
    map.set_at(1, "b".to_string(), 20).unwrap();
    assert_eq!(map.get("b"), Some(&20));

    let err = map.set_at(0, "b".to_string(), 0).unwrap_err();
    assert!(matches!(err, Error::DuplicateKey { index: 1 }));
    assert_index_consistent(&map);
}

#[test]
fn set_value_at_keeps_key() {
    let mut map = OrderedMap::new();
    map.add("a".to_string(), 1).unwrap();
    assert_eq!(map.set_value_at(0, 5).unwrap(), 1);
    assert_eq!(map.get("a"), Some(&5));
    assert!(matches!(
        map.set_value_at(1, 0),
        Err(Error::IndexOutOfRange { index: 1, len: 1 })
    ));
}

#[test]
fn cursor_walks_entries_and_detects_modification() {
    let mut map = OrderedMap::new();
    map.add("a".to_string(), 1).unwrap();
    map.add("b".to_string(), 2).unwrap();

    let mut cursor = map.cursor();
    let (key, value) = cursor.next(&map).unwrap().unwrap();
    assert_eq!((key.as_str(), *value), ("a", 1));
    assert_eq!(cursor.position(), 1);

    map.add("c".to_string(), 3).unwrap();
    assert!(matches!(cursor.next(&map), Err(Error::CollectionModified)));

    let mut cursor = map.cursor();
    let mut seen = Vec::new();
    while let Some((key, _)) = cursor.next(&map).unwrap() {
        seen.push(key.clone());
    }
    assert_eq!(seen, ["a", "b", "c"]);
    assert!(cursor.next(&map).unwrap().is_none());
}

#[test]
fn from_keyed_rejects_duplicates() {
    let names = ["root", "hip", "root"];
    let err = OrderedMap::from_keyed(names, |name| name.to_string()).unwrap_err();
    assert!(matches!(err, Error::DuplicateKey { index: 0 }));

    let map = OrderedMap::from_keyed(["root", "hip"], |name| name.to_string()).unwrap();
    assert_eq!(map.index_of("hip"), Some(1));
}

#[test]
fn iteration_runs_both_directions() {
    let map: OrderedMap<String, i32> = (0..4).map(|i| (format!("k{i}"), i)).collect();
    let forward: Vec<i32> = map.iter().map(|(_, v)| *v).collect();
    let backward: Vec<i32> = map.iter().rev().map(|(_, v)| *v).collect();
    assert_eq!(forward, [0, 1, 2, 3]);
    assert_eq!(backward, [3, 2, 1, 0]);
    assert_eq!(map.iter().len(), 4);

    let owned: Vec<(String, i32)> = map.into_iter().collect();
    assert_eq!(owned[2], ("k2".to_string(), 2));
}

#[test]
fn index_stays_consistent_under_mixed_operations() {
    let mut map: OrderedMap<String, i32> = OrderedMap::new();
    let mut seed: u32 = 0x2545_f491;
    let mut next = move || {
        seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        seed >> 8
    };

    for step in 0..500 {
        let key = format!("k{}", next() % 40);
        match next() % 5 {
            0 => {
                let _ = map.add(key, step);
            }
            1 => {
                let index = next() as usize % (map.len() + 1);
                let _ = map.insert(index, key, step);
            }
            2 if !map.is_empty() => {
                let index = next() as usize % map.len();
                map.remove_at(index).unwrap();
            }
            3 => {
                map.remove(key.as_str());
            }
            _ => {
                map.set(key, step);
            }
        }
        assert_index_consistent(&map);
    }
}

#[cfg(feature = "json")]
#[test]
fn serde_round_trip_preserves_order_and_rejects_duplicates() {
    let map: OrderedMap<String, i32> = serde_json::from_str(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
    assert_eq!(keys, ["z", "a", "m"]);

    let text = serde_json::to_string(&map).unwrap();
    assert_eq!(text, r#"{"z":1,"a":2,"m":3}"#);

    let err = serde_json::from_str::<OrderedMap<String, i32>>(r#"{"a": 1, "a": 2}"#);
    assert!(err.is_err());
}
