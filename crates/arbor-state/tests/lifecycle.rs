//! Integration tests for node lifecycle operations.
//!
//! Detach, attach, merge, reload and staleness across node kinds.

use arbor_state::{path, ArborError, Lifecycle, MutationEvent, Node, Operation, Seg, Store, Value};
use serde_json::json;
use std::sync::{Arc, Mutex};

fn sample_store() -> Store {
    Store::new(json!({
        "user": {"name": "ada", "role": "admin"},
        "items": [{"n": 1}, {"n": 2}, {"n": 3}]
    }))
}

fn record(store: &Store) -> Arc<Mutex<Vec<MutationEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    store.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
    events
}

// ============================================================================
// Detach / attach
// ============================================================================

#[test]
fn test_detach_removes_from_parent() {
    let store = sample_store();
    let events = record(&store);
    let user = store.get_node_at(&path!("user")).unwrap();

    let removed = user.detach().unwrap();

    assert_eq!(removed.get("name").and_then(Value::as_str), Some("ada"));
    assert!(store.get(&path!("user")).is_none());
    assert!(!user.is_attached().unwrap());
    assert!(user.is_stale().unwrap());

    let events = events.lock().unwrap();
    assert_eq!(events[0].mutation_path, path!());
    assert_eq!(events[0].metadata.operation, Operation::Delete);
    assert_eq!(events[0].metadata.props, vec![Seg::key("user")]);
}

#[test]
fn test_detach_root_fails() {
    let store = sample_store();
    let root = store.root().unwrap();
    assert!(matches!(root.detach(), Err(ArborError::RootDetach)));
}

#[test]
fn test_detach_twice_reports_detached() {
    let store = sample_store();
    let user = store.get_node_at(&path!("user")).unwrap();
    user.detach().unwrap();
    assert!(matches!(user.detach(), Err(ArborError::Detached { .. })));
}

#[test]
fn test_attach_restores_detached_value() {
    let store = sample_store();
    let user = store.get_node_at(&path!("user")).unwrap();
    user.detach().unwrap();

    let attached = user.attach().unwrap();

    assert!(attached.value().same(user.value()));
    assert!(user.is_attached().unwrap());
    assert_eq!(attached.path().unwrap(), &path!("user"));
}

fn item_ns(store: &Store) -> Vec<i64> {
    store
        .get(&path!("items"))
        .unwrap()
        .as_list()
        .unwrap()
        .iter()
        .filter_map(|item| item.get("n").and_then(Value::as_i64))
        .collect()
}

#[test]
fn test_attach_last_list_child_appends() {
    let store = sample_store();
    let last = store.get_node_at(&path!("items", 2usize)).unwrap();
    last.detach().unwrap();
    assert_eq!(item_ns(&store), vec![1, 2]);

    let attached = last.attach().unwrap();

    assert_eq!(item_ns(&store), vec![1, 2, 3]);
    assert_eq!(attached.path().unwrap(), &path!("items", 2usize));
}

#[test]
fn test_attach_list_child_overwrites_current_occupant() {
    let store = sample_store();
    let second = store.get_node_at(&path!("items", 1usize)).unwrap();
    second.detach().unwrap();
    assert_eq!(item_ns(&store), vec![1, 3]);

    second.attach().unwrap();

    assert_eq!(item_ns(&store), vec![1, 2]);
}

#[test]
fn test_attach_stale_list_element_restores_old_value() {
    let store = Store::new(json!({"items": [{"n": "x"}, {"n": "y"}]}));
    let events = record(&store);
    let x = store.get_node_at(&path!("items", 0usize)).unwrap();
    x.set("k", 1).unwrap();
    assert!(x.is_stale().unwrap());

    let attached = x.attach().unwrap();

    let items = store.get(&path!("items")).unwrap();
    assert_eq!(items.len(), 2);
    assert!(attached.value().same(x.value()));
    assert!(items.get(0usize).unwrap().get("k").is_none());

    let events = events.lock().unwrap();
    assert_eq!(events[1].mutation_path, path!("items"));
    assert_eq!(events[1].metadata.operation, Operation::Set);
    assert_eq!(events[1].metadata.props, vec![Seg::index(0)]);
}

#[test]
fn test_attach_past_end_of_list_fails() {
    let store = sample_store();
    let last = store.get_node_at(&path!("items", 2usize)).unwrap();
    last.detach().unwrap();
    store.get_node_at(&path!("items", 1usize)).unwrap().detach().unwrap();

    let err = last.attach().unwrap_err();
    assert!(matches!(err, ArborError::IndexOutOfBounds { index: 2, len: 1, .. }));
}

#[test]
fn test_attach_installed_node_is_noop() {
    let store = sample_store();
    let events = record(&store);
    let user = store.get_node_at(&path!("user")).unwrap();

    let attached = user.attach().unwrap();

    assert!(attached.same(&user));
    assert!(events.lock().unwrap().is_empty());
}

#[test]
fn test_container_replaced_by_leaf_is_not_attached() {
    let store = Store::new(json!({"a": {"b": 1}}));
    let a = store.get_node_at(&path!("a")).unwrap();

    store.root().unwrap().set("a", 5).unwrap();

    assert!(a.reload().unwrap().is_none());
    assert!(!a.is_attached().unwrap());
    assert!(a.is_stale().unwrap());
}

#[test]
fn test_attach_root_returns_root() {
    let store = sample_store();
    let root = store.root().unwrap();
    assert!(root.attach().unwrap().same(&root));
}

// ============================================================================
// Merge / reload
// ============================================================================

#[test]
fn test_merge_writes_all_attributes_in_one_event() {
    let store = sample_store();
    let events = record(&store);
    let user = store.get_node_at(&path!("user")).unwrap();

    let fresh = user.merge([("name", "grace"), ("team", "core")]).unwrap();

    assert_eq!(fresh.value().get("name").and_then(Value::as_str), Some("grace"));
    assert_eq!(fresh.value().get("role").and_then(Value::as_str), Some("admin"));
    assert_eq!(fresh.value().get("team").and_then(Value::as_str), Some("core"));
    assert_eq!(user.value().get("name").and_then(Value::as_str), Some("ada"));

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].mutation_path, path!("user"));
    assert_eq!(events[0].metadata.operation, Operation::Merge);
    assert_eq!(events[0].metadata.props, vec![Seg::key("name"), Seg::key("team")]);
}

#[test]
fn test_merge_on_list_is_type_mismatch() {
    let store = sample_store();
    let before = store.state();
    let items = store.get_node_at(&path!("items")).unwrap();

    let err = items.merge([("x", 1)]).unwrap_err();

    assert!(matches!(err, ArborError::TypeMismatch { .. }));
    assert!(store.state().same(&before));
}

#[test]
fn test_reload_follows_the_path() {
    let store = sample_store();
    let user = store.get_node_at(&path!("user")).unwrap();
    assert!(user.reload().unwrap().unwrap().same(&user));

    user.set("name", "grace").unwrap();
    let fresh = user.reload().unwrap().unwrap();
    assert!(!fresh.same(&user));
    assert_eq!(fresh.get("name").unwrap().value().as_str(), Some("grace"));

    fresh.detach().unwrap();
    assert!(user.reload().unwrap().is_none());
}

#[test]
fn test_parent_of_nested_node() {
    let store = sample_store();
    let item = store.get_node_at(&path!("items", 0usize)).unwrap();
    let parent = item.parent().unwrap().unwrap();
    assert_eq!(parent.path().unwrap(), &path!("items"));
    assert!(store.root().unwrap().parent().unwrap().is_none());
}

#[test]
fn test_typed_views_share_lifecycle() {
    let store = sample_store();
    let items = store.get_node_at(&path!("items")).unwrap().as_list().unwrap();
    items.push([json!({"n": 4})]).unwrap();
    assert!(items.is_stale().unwrap());

    let user = store.get_node_at(&path!("user")).unwrap().as_object().unwrap();
    assert!(!user.is_stale().unwrap());
    assert_eq!(Lifecycle::path(&user).unwrap(), &path!("user"));
}

// ============================================================================
// Unbound nodes
// ============================================================================

#[test]
fn test_unbound_node_lifecycle_fails() {
    let node = Node::unbound(json!({"a": 1}));
    assert!(matches!(node.detach(), Err(ArborError::NotBound)));
    assert!(matches!(node.attach(), Err(ArborError::NotBound)));
    assert!(matches!(node.reload(), Err(ArborError::NotBound)));
    assert!(matches!(node.merge([("b", 2)]), Err(ArborError::NotBound)));
    assert!(matches!(node.set("b", 2), Err(ArborError::NotBound)));
}

#[test]
fn test_dropped_store_unbinds_nodes() {
    let store = sample_store();
    let user = store.get_node_at(&path!("user")).unwrap();
    drop(store);

    assert!(matches!(user.reload(), Err(ArborError::NotBound)));
    assert_eq!(user.value().get("name").and_then(Value::as_str), Some("ada"));
}
