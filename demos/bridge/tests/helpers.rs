#![allow(dead_code)]

use bridge::*;
use relfilter::{Key, Store};
use std::collections::BTreeSet;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn two_ids(store: &Store, filter: &serde_json::Value) -> Vec<String> {
    store
        .query()
        .find("EntityTwo", filter)
        .unwrap()
        .into_iter()
        .map(|row| row.get("fieldId").unwrap().as_str().unwrap().to_string())
        .collect()
}

/// Three `EntityOne`s and five `EntityTwo`s with assorted links:
/// - t1: no links
/// - t2: linked to one 1 with data
/// - t3: linked to one 1 without data, and to one 2 with data
/// - t4: flag off, linked to one 3 with data
/// - t5: upper-case name, no links
pub fn mixed_store() -> Store {
    let mut store = new_store().unwrap();
    for i in 1..=3 {
        store
            .insert(EntityOne::new(format!("one{}", i), format!("one{}@example.com", i)))
            .unwrap();
    }
    store.insert(EntityTwo::new("t1", "asdfg")).unwrap();
    store.insert(EntityTwo::new("t2", "xasdf")).unwrap();
    store.insert(EntityTwo::new("t3", "asdfASDF")).unwrap();
    store.insert(EntityTwo::new("t4", "asdf").flag(false)).unwrap();
    store.insert(EntityTwo::new("t5", "ASDF")).unwrap();
    store.insert(EntityMiddle::new(1, "t2").data("x")).unwrap();
    store.insert(EntityMiddle::new(1, "t3")).unwrap();
    store.insert(EntityMiddle::new(2, "t3").data("y")).unwrap();
    store.insert(EntityMiddle::new(3, "t4").data("z")).unwrap();
    store
}

/// Primary keys of the rows selected by a JSON filter
pub fn keys(store: &Store, entity: &str, filter: &serde_json::Value) -> BTreeSet<Key> {
    let schema = store.schema(entity).unwrap();
    store
        .find(entity, filter)
        .unwrap()
        .into_iter()
        .map(|row| row.key(schema))
        .collect()
}
