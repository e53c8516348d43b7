//! Integration tests for keyed-map nodes.

use arbor_state::{path, Child, MapNode, MutationEvent, Operation, Seg, Store, Value};
use serde_json::json;
use std::sync::{Arc, Mutex};

fn store_with_tags() -> (Store, MapNode) {
    let tags = Value::map([("a", json!({"label": "A"})), ("b", json!({"label": "B"}))]);
    let store = Store::new(Value::object([("tags", tags)]));
    let map = store.get_node_at(&path!("tags")).unwrap().as_map().unwrap();
    (store, map)
}

fn record(store: &Store) -> Arc<Mutex<Vec<MutationEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    store.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
    events
}

// ============================================================================
// Reads
// ============================================================================

#[test]
fn test_keys_keep_insertion_order() {
    let (_store, tags) = store_with_tags();
    assert_eq!(tags.keys(), vec!["a", "b"]);
    assert_eq!(tags.len(), 2);
    assert!(tags.contains_key("a"));
    assert!(!tags.contains_key("z"));

    let labels: Vec<String> = tags
        .entries()
        .into_iter()
        .map(|(key, child)| {
            let label = child.value().get("label").and_then(Value::as_str).unwrap_or_default();
            format!("{key}={label}")
        })
        .collect();
    assert_eq!(labels, vec!["a=A", "b=B"]);
}

#[test]
fn test_entry_nodes_use_key_segments() {
    let (_store, tags) = store_with_tags();
    let Some(Child::Node(a)) = tags.get("a") else {
        panic!("expected a node for entry a");
    };
    assert_eq!(a.path().unwrap(), &path!("tags", "a"));
}

// ============================================================================
// Writes
// ============================================================================

#[test]
fn test_set_new_entry_appends() {
    let (store, tags) = store_with_tags();
    let events = record(&store);

    assert!(tags.set("c", json!({"label": "C"})).unwrap());

    let current = store.get_node_at(&path!("tags")).unwrap().as_map().unwrap();
    assert_eq!(current.keys(), vec!["a", "b", "c"]);
    let events = events.lock().unwrap();
    assert_eq!(events[0].metadata.operation, Operation::Set);
    assert_eq!(events[0].metadata.props, vec![Seg::key("c")]);
}

#[test]
fn test_set_same_value_is_noop() {
    let (store, tags) = store_with_tags();
    let events = record(&store);
    let existing = store.get(&path!("tags", "a")).unwrap();

    assert!(!tags.set("a", existing).unwrap());
    assert!(events.lock().unwrap().is_empty());
}

#[test]
fn test_delete_present_and_absent() {
    let (store, tags) = store_with_tags();
    let events = record(&store);

    let removed = tags.delete("a").unwrap().unwrap();
    assert_eq!(removed.get("label").and_then(Value::as_str), Some("A"));
    assert!(tags.delete("missing").unwrap().is_none());

    assert_eq!(events.lock().unwrap().len(), 1);
    assert!(store.get(&path!("tags", "a")).is_none());
}

#[test]
fn test_clear_reports_removed_keys() {
    let (store, tags) = store_with_tags();
    let events = record(&store);

    let removed = tags.clear().unwrap();

    assert_eq!(removed, vec!["a", "b"]);
    assert!(store.get(&path!("tags")).unwrap().is_empty());
    let events = events.lock().unwrap();
    assert_eq!(events[0].metadata.operation, Operation::Clear);
    assert_eq!(events[0].metadata.props, vec![Seg::key("a"), Seg::key("b")]);
}

#[test]
fn test_clear_on_empty_map_still_mutates() {
    let store = Store::new(Value::object([("tags", Value::empty_map())]));
    let before = store.state();
    let tags = store.get_node_at(&path!("tags")).unwrap().as_map().unwrap();

    assert!(tags.clear().unwrap().is_empty());
    assert!(!store.state().same(&before));
}

#[test]
fn test_index_segment_is_stored_as_key() {
    let (store, tags) = store_with_tags();
    let event = tags.node().set(0usize, 1).unwrap();

    assert_eq!(event.metadata.props, vec![Seg::key("0")]);
    assert_eq!(store.get(&path!("tags", "0")).unwrap().as_i64(), Some(1));
}
