//! Integration tests for copy-on-write mutation and the node cache.
//!
//! These tests verify that writes never touch existing snapshots, that only
//! the ancestor chain of a mutation gets new identities, and that cached
//! nodes stay stable until their value changes.

use arbor_state::{
    path, ArborError, Child, Lifecycle, MutationMetadata, Operation, Path, Seg, Store, Value,
};
use serde_json::json;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

fn fixture() -> Store {
    Store::new(json!({
        "todos": {"a": {"text": "x", "done": false}, "b": {"text": "y", "done": true}},
        "user": {"name": "ann", "tags": ["admin"]},
    }))
}

// ============================================================================
// Snapshot immutability
// ============================================================================

#[test]
fn test_previous_snapshot_unchanged_after_write() {
    let store = fixture();
    let before = store.state();

    store
        .get_node_at(&path!("todos", "a"))
        .unwrap()
        .set("text", "changed")
        .unwrap();

    assert_eq!(
        before.at_path(&path!("todos", "a", "text")).and_then(Value::as_str),
        Some("x")
    );
    assert_eq!(
        store.get(&path!("todos", "a", "text")).unwrap().as_str(),
        Some("changed")
    );
}

#[test]
fn test_node_snapshot_is_frozen() {
    let store = fixture();
    let todo = store.get_node_at(&path!("todos", "a")).unwrap();

    todo.set("done", true).unwrap();

    assert_eq!(todo.get("done").unwrap().value().as_bool(), Some(false));
    let fresh = todo.reload().unwrap().unwrap();
    assert_eq!(fresh.get("done").unwrap().value().as_bool(), Some(true));
}

// ============================================================================
// Structural sharing
// ============================================================================

#[test]
fn test_only_ancestor_chain_is_copied() {
    let store = fixture();
    let before = store.state();

    store
        .get_node_at(&path!("todos", "a"))
        .unwrap()
        .set("done", true)
        .unwrap();
    let after = store.state();

    assert!(!after.same(&before));
    assert!(!after.get("todos").unwrap().same(before.get("todos").unwrap()));
    assert!(!after
        .at_path(&path!("todos", "a"))
        .unwrap()
        .same(before.at_path(&path!("todos", "a")).unwrap()));

    assert!(after.get("user").unwrap().same(before.get("user").unwrap()));
    assert!(after
        .at_path(&path!("todos", "b"))
        .unwrap()
        .same(before.at_path(&path!("todos", "b")).unwrap()));
}

#[test]
fn test_merge_scenario_keeps_untouched_references() {
    let store = Store::new(json!({
        "todos": {"1": {"id": "1", "text": "a"}},
        "settings": {"theme": "dark"},
    }));
    let before = store.state();
    let todo = store.get_node_at(&path!("todos", "1")).unwrap();

    let merged = todo.merge([("text", "b")]).unwrap();

    let after = store.state();
    assert_eq!(merged.get("text").unwrap().value().as_str(), Some("b"));
    assert!(!merged.value().same(todo.value()));
    assert!(after.get("settings").unwrap().same(before.get("settings").unwrap()));
    assert_eq!(
        after.at_path(&path!("todos", "1", "id")).and_then(Value::as_str),
        Some("1")
    );
}

// ============================================================================
// Node cache
// ============================================================================

#[test]
fn test_get_node_at_returns_cached_node() {
    let store = fixture();
    let first = store.get_node_at(&path!("user")).unwrap();
    let second = store.get_node_at(&path!("user")).unwrap();
    assert!(first.same(&second));

    let via_parent = store
        .root()
        .unwrap()
        .get("user")
        .and_then(Child::into_node)
        .unwrap();
    assert!(via_parent.same(&first));
}

#[test]
fn test_mutation_replaces_nodes_on_chain() {
    let store = fixture();
    let root = store.root().unwrap();
    let todos = store.get_node_at(&path!("todos")).unwrap();
    let user = store.get_node_at(&path!("user")).unwrap();

    todos.set("c", json!({"text": "z"})).unwrap();

    assert!(root.is_stale().unwrap());
    assert!(todos.is_stale().unwrap());
    assert!(!user.is_stale().unwrap());
    assert!(store.get_node_at(&path!("user")).unwrap().same(&user));
}

#[test]
fn test_leaves_are_not_nodes() {
    let store = fixture();
    assert!(store.get_node_at(&path!("user", "name")).is_none());
    assert!(store.get_node_at(&path!("missing")).is_none());
    assert_eq!(store.get(&path!("user", "name")).unwrap().as_str(), Some("ann"));
}

#[test]
fn test_index_paths_are_canonical() {
    let store = fixture();
    let by_key = store.get_node_at(&"/user/tags".parse::<Path>().unwrap()).unwrap();
    let tags = by_key.as_list().unwrap();
    assert_eq!(tags.at(0).unwrap().value().as_str(), Some("admin"));

    let parsed: Path = "/todos/a".parse().unwrap();
    let node = store.get_node_at(&parsed).unwrap();
    assert_eq!(node.path().unwrap(), &path!("todos", "a"));
}

#[test]
fn test_reads_through_stale_node_are_historical() {
    let store = fixture();
    let stale_root = store.root().unwrap();
    store.root().unwrap().set("user", json!({"name": "bob"})).unwrap();

    let old_user = stale_root.get("user").and_then(Child::into_node).unwrap();
    assert_eq!(old_user.get("name").unwrap().value().as_str(), Some("ann"));

    let current = store.get_node_at(&path!("user")).unwrap();
    assert!(!current.same(&old_user));
    assert_eq!(current.get("name").unwrap().value().as_str(), Some("bob"));
}

#[test]
fn test_write_through_stale_node_targets_current_value() {
    let store = fixture();
    let stale = store.get_node_at(&path!("user")).unwrap();
    stale.set("name", "bob").unwrap();
    stale.set("age", 30).unwrap();

    let current = store.get(&path!("user")).unwrap();
    assert_eq!(current.get("name").and_then(Value::as_str), Some("bob"));
    assert_eq!(current.get("age").and_then(Value::as_i64), Some(30));
}

// ============================================================================
// Events and errors
// ============================================================================

#[test]
fn test_set_on_empty_map_emits_one_event() {
    let store = Store::new(Value::object([("todos", Value::empty_map())]));
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let _sub = store.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

    let todos = store.get_node_at(&path!("todos")).unwrap().as_map().unwrap();
    assert!(todos.set("x", json!({"text": "t"})).unwrap());

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].mutation_path, path!("todos"));
    assert_eq!(events[0].metadata.operation, Operation::Set);
    assert_eq!(events[0].metadata.props, vec![Seg::key("x")]);
}

#[test]
fn test_set_on_missing_node_is_detached() {
    let store = fixture();
    let todo = store.get_node_at(&path!("todos", "a")).unwrap();
    todo.detach().unwrap();

    let err = todo.set("text", "again").unwrap_err();
    assert!(matches!(err, ArborError::Detached { .. }));
}

#[test]
fn test_set_root_rehydrates() {
    let store = fixture();
    let old_user = store.get_node_at(&path!("user")).unwrap();

    let event = store.set_root(json!({"user": {"name": "restored"}})).unwrap();

    assert_eq!(event.metadata.operation, Operation::Replace);
    assert!(old_user.is_stale().unwrap());
    assert_eq!(
        store.get(&path!("user", "name")).unwrap().as_str(),
        Some("restored")
    );
}

// ============================================================================
// Custom mutators
// ============================================================================

#[test]
fn test_mutator_reading_the_store_completes() {
    let store = fixture();
    let worker = store.clone();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let reader = worker.clone();
        let result = worker.mutate(&path!("user"), move |value| {
            let first = reader.get(&path!("todos", "a", "text")).unwrap_or_default();
            let todos = reader.get_node_at(&path!("todos")).map(|n| n.len()).unwrap_or(0);
            *value = Value::object([("name", first), ("todos", Value::from(todos))]);
            Ok(MutationMetadata::new(Operation::Set, vec![Seg::key("name"), Seg::key("todos")]))
        });
        let _ = tx.send(result.map(|event| event.mutation_path));
    });

    let mutation_path = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("mutator reading the store never finished")
        .unwrap();
    assert_eq!(mutation_path, path!("user"));
    assert_eq!(store.get(&path!("user", "name")).unwrap().as_str(), Some("x"));
    assert_eq!(store.get(&path!("user", "todos")).unwrap().as_i64(), Some(2));
}

#[test]
fn test_mutator_racing_another_write_is_rejected() {
    let store = fixture();
    let before = store.state();
    let user = store.get_node_at(&path!("user")).unwrap();

    let err = store
        .mutate(&path!("todos"), move |_| {
            user.set("name", "bob")?;
            Ok(MutationMetadata::new(Operation::Set, vec![]))
        })
        .unwrap_err();

    assert!(matches!(err, ArborError::Conflict { .. }));
    let after = store.state();
    assert_eq!(after.at_path(&path!("user", "name")).unwrap().as_str(), Some("bob"));
    assert!(after.get("todos").unwrap().same(before.get("todos").unwrap()));
}
