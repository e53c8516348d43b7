//! Integration tests for subscriptions, scoped watches and re-entrant
//! delivery.

use arbor_state::{
    path, watch, ArborError, MutationEvent, Node, Operation, Seg, Store, StoreConfig,
    DEFAULT_MAX_NOTIFICATION_DEPTH,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn board() -> Store {
    Store::new(json!({
        "todos": {"a": {"text": "x", "done": false}, "b": {"text": "y", "done": false}},
        "user": {"name": "ann"},
        "count": {"n": 0}
    }))
}

fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    (hits.clone(), hits)
}

// ============================================================================
// Store-wide subscriptions
// ============================================================================

#[test]
fn test_observers_run_in_registration_order() {
    let store = board();
    let order = Arc::new(Mutex::new(Vec::new()));
    for tag in ["first", "second", "third"] {
        let order = order.clone();
        store.subscribe(move |_| order.lock().unwrap().push(tag));
    }

    store.get_node_at(&path!("user")).unwrap().set("name", "bob").unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
}

#[test]
fn test_event_carries_both_snapshots() {
    let store = board();
    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    store.subscribe(move |event: &MutationEvent| {
        *sink.lock().unwrap() = Some(event.clone());
    });

    store.get_node_at(&path!("user")).unwrap().set("name", "bob").unwrap();

    let event = seen.lock().unwrap().take().unwrap();
    assert_eq!(event.mutation_path, path!("user"));
    assert_eq!(event.metadata.operation, Operation::Set);
    assert_eq!(event.metadata.props, vec![Seg::key("name")]);
    assert_eq!(
        event.previous.at_path(&path!("user", "name")).unwrap().as_str(),
        Some("ann")
    );
    assert_eq!(
        event.state.at_path(&path!("user", "name")).unwrap().as_str(),
        Some("bob")
    );
    assert!(event.state.same(&store.state()));
}

#[test]
fn test_observer_sees_installed_tree() {
    let store = board();
    let handle = store.get_node_at(&path!("user")).unwrap();
    let observed = Arc::new(Mutex::new(String::new()));
    let sink = observed.clone();
    let probe = handle.clone();
    store.subscribe(move |_| {
        let current = probe.store().unwrap().get(&path!("user", "name")).unwrap();
        *sink.lock().unwrap() = current.as_str().unwrap_or_default().to_string();
    });

    handle.set("name", "bob").unwrap();

    assert_eq!(*observed.lock().unwrap(), "bob");
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let store = board();
    let (hits, count) = counter();
    let sub = store.subscribe(move |_| {
        count.fetch_add(1, Ordering::SeqCst);
    });
    let user = store.get_node_at(&path!("user")).unwrap();

    user.set("name", "b").unwrap();
    assert_eq!(store.subscriber_count(), 1);
    assert!(sub.unsubscribe());
    user.set("name", "c").unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(store.subscriber_count(), 0);
}

#[test]
fn test_failed_mutation_notifies_nobody() {
    let store = board();
    let (hits, count) = counter();
    store.subscribe(move |_| {
        count.fetch_add(1, Ordering::SeqCst);
    });

    let err = store.mutate(&path!("missing"), |_| unreachable!()).unwrap_err();

    assert!(matches!(err, ArborError::Detached { .. }));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Scoped watches
// ============================================================================

#[test]
fn test_targets_ignores_siblings() {
    let store = board();
    let todo = store.get_node_at(&path!("todos", "a")).unwrap();
    let (hits, count) = counter();
    let _sub = store
        .watch(&todo, watch::targets(), move |_, _| {
            count.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    store.get_node_at(&path!("todos", "b")).unwrap().set("done", true).unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    todo.set("done", true).unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_watch_hands_over_fresh_node() {
    let store = board();
    let todo = store.get_node_at(&path!("todos", "a")).unwrap();
    let latest: Arc<Mutex<Option<Node>>> = Arc::new(Mutex::new(None));
    let sink = latest.clone();
    let _sub = store
        .watch(&todo, watch::targets(), move |_, fresh| {
            *sink.lock().unwrap() = fresh;
        })
        .unwrap();

    todo.set("text", "z").unwrap();

    let fresh = latest.lock().unwrap().take().unwrap();
    assert_eq!(fresh.get("text").unwrap().value().as_str(), Some("z"));
    assert!(fresh.same(&store.get_node_at(&path!("todos", "a")).unwrap()));
}

#[test]
fn test_watch_child_props_narrows_events() {
    let store = board();
    let todos = store.get_node_at(&path!("todos")).unwrap();
    let (hits, count) = counter();
    let _sub = store
        .watch(&todos, watch::watch_child("a", ["done"]), move |_, _| {
            count.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    let a = store.get_node_at(&path!("todos", "a")).unwrap();
    a.set("text", "ignored").unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    a.set("done", true).unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    todos.delete("a").unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[test]
fn test_watch_children_props() {
    let store = board();
    let todos = store.get_node_at(&path!("todos")).unwrap();
    let (hits, count) = counter();
    let _sub = store
        .watch(&todos, watch::watch_children_props(["done"]), move |_, _| {
            count.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    store.get_node_at(&path!("todos", "b")).unwrap().set("text", "no").unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    store.get_node_at(&path!("todos", "b")).unwrap().set("done", true).unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_set_root_reaches_every_watch() {
    let store = board();
    let user = store.get_node_at(&path!("user")).unwrap();
    let (hits, count) = counter();
    let _sub = store
        .watch(&user, watch::targets(), move |_, _| {
            count.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    store.set_root(json!({"user": {"name": "new"}})).unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_watch_requires_bound_node() {
    let store = board();
    let err = store
        .watch(&Node::unbound(json!({})), watch::targets(), |_, _| {})
        .unwrap_err();
    assert!(matches!(err, ArborError::NotBound));
}

// ============================================================================
// Re-entrant delivery
// ============================================================================

/// Subscriber that bumps `/count/n` on every event it sees, recording how
/// many of its own writes went through.
fn self_mutating(store: &Store) -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let accepted = Arc::new(AtomicUsize::new(0));
    let rejected = Arc::new(AtomicUsize::new(0));
    let (ok, err) = (accepted.clone(), rejected.clone());
    let count = store.get_node_at(&path!("count")).unwrap();
    store.subscribe(move |event| {
        let n = event
            .state
            .at_path(&path!("count", "n"))
            .and_then(|n| n.as_i64())
            .unwrap_or_default();
        match count.set("n", n + 1) {
            Ok(_) => ok.fetch_add(1, Ordering::SeqCst),
            Err(ArborError::NotificationLoop { .. }) => err.fetch_add(1, Ordering::SeqCst),
            Err(other) => panic!("unexpected error: {other}"),
        };
    });
    (accepted, rejected)
}

#[test]
fn test_nested_mutations_stop_at_limit() {
    let store = board();
    let (accepted, rejected) = self_mutating(&store);

    store.get_node_at(&path!("user")).unwrap().set("name", "go").unwrap();

    // one outer write plus one nested write per allowed level
    assert_eq!(accepted.load(Ordering::SeqCst), DEFAULT_MAX_NOTIFICATION_DEPTH);
    assert_eq!(rejected.load(Ordering::SeqCst), 1);
    assert_eq!(
        store.get(&path!("count", "n")).unwrap().as_i64(),
        Some(DEFAULT_MAX_NOTIFICATION_DEPTH as i64)
    );
}

#[test]
fn test_zero_depth_forbids_mutating_from_observers() {
    let store = Store::with_config(
        json!({"user": {"name": "ann"}, "count": {"n": 0}}),
        StoreConfig::new().with_max_notification_depth(0),
    );
    let (accepted, rejected) = self_mutating(&store);

    store.get_node_at(&path!("user")).unwrap().set("name", "go").unwrap();

    assert_eq!(accepted.load(Ordering::SeqCst), 0);
    assert_eq!(rejected.load(Ordering::SeqCst), 1);
}

#[test]
fn test_depth_resets_after_delivery() {
    let store = Store::with_config(
        json!({"user": {"name": "ann"}, "count": {"n": 0}}),
        StoreConfig::new().with_max_notification_depth(0),
    );
    let (_accepted, rejected) = self_mutating(&store);
    let user = store.get_node_at(&path!("user")).unwrap();

    user.set("name", "one").unwrap();
    user.set("name", "two").unwrap();

    assert_eq!(rejected.load(Ordering::SeqCst), 2);
}
