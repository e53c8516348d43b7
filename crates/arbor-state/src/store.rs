//! The store: owner of the current root, the node cache and the subscribers.

use crate::engine::TreeState;
use crate::event::MutationEvent;
use crate::plugin::StorePlugin;
use crate::subscriptions::{Subscription, Subscriptions};
use crate::watch::Relevance;
use crate::{ArborResult, Node, Path, Value};
use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Mutex, Weak};

/// Default bound on nested re-entrant mutations.
pub const DEFAULT_MAX_NOTIFICATION_DEPTH: usize = 8;

/// Store configuration.
///
/// ```
/// use arbor_state::StoreConfig;
///
/// let config: StoreConfig = serde_json::from_str("{}").unwrap();
/// assert_eq!(config.max_notification_depth, 8);
///
/// let config = StoreConfig::new().with_max_notification_depth(2);
/// assert_eq!(config.max_notification_depth, 2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// How many mutations may be nested inside subscriber callbacks before
    /// further ones are rejected with `NotificationLoop`. Zero forbids
    /// mutating from a subscriber at all.
    pub max_notification_depth: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_notification_depth: DEFAULT_MAX_NOTIFICATION_DEPTH,
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_notification_depth(mut self, depth: usize) -> Self {
        self.max_notification_depth = depth;
        self
    }
}

pub(crate) struct StoreInner {
    pub(crate) config: StoreConfig,
    pub(crate) tree: Mutex<TreeState>,
    pub(crate) subscriptions: Subscriptions,
    /// Number of event deliveries currently on the stack.
    pub(crate) delivery_depth: AtomicUsize,
}

/// A reactive copy-on-write state tree.
///
/// Cloning a `Store` yields another handle to the same tree.
///
/// ```
/// use arbor_state::{path, Store};
/// use serde_json::json;
///
/// let store = Store::new(json!({"count": 0}));
/// let before = store.state();
///
/// store.root().unwrap().set("count", 1).unwrap();
///
/// assert_eq!(store.get(&path!("count")).unwrap().as_i64(), Some(1));
/// assert_eq!(before.get("count").unwrap().as_i64(), Some(0));
/// ```
#[derive(Clone)]
pub struct Store {
    pub(crate) inner: Arc<StoreInner>,
}

impl Store {
    /// Create a store with the default configuration.
    pub fn new(initial: impl Into<Value>) -> Self {
        Self::with_config(initial, StoreConfig::default())
    }

    pub fn with_config(initial: impl Into<Value>, config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                config,
                tree: Mutex::new(TreeState::new(initial.into())),
                subscriptions: Subscriptions::new(),
                delivery_depth: AtomicUsize::new(0),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<StoreInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<StoreInner> {
        Arc::downgrade(&self.inner)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Node for the current root. `None` for a single-leaf store.
    pub fn root(&self) -> Option<Node> {
        self.get_node_at(&Path::root())
    }

    /// The current root value.
    pub fn state(&self) -> Value {
        self.lock_tree().root.clone()
    }

    /// Raw value at `path` in the current tree, leaves included.
    pub fn get(&self, path: &Path) -> Option<Value> {
        let tree = self.lock_tree();
        crate::engine::resolve(&tree.root, path).map(|(_, value)| value.clone())
    }

    /// Register an observer for every mutation of this store.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&MutationEvent) + Send + Sync + 'static,
    {
        let id = self.inner.subscriptions.add(Arc::new(observer));
        Subscription::new(id, self.downgrade())
    }

    /// Number of registered observers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscriptions.len()
    }

    /// Observe `node` with a relevance predicate.
    ///
    /// On a relevant event the callback receives the event and the node's
    /// fresh version (`None` once its path stops resolving). The fresh node
    /// becomes the one the predicate sees next time.
    pub fn watch<R, F>(&self, node: &Node, relevance: R, callback: F) -> ArborResult<Subscription>
    where
        R: Relevance + 'static,
        F: Fn(&MutationEvent, Option<Node>) + Send + Sync + 'static,
    {
        let path = node.path()?.clone();
        let current = Mutex::new(node.clone());
        let store = self.downgrade();
        let observer = move |event: &MutationEvent| {
            let Some(inner) = store.upgrade() else {
                return;
            };
            let fresh = {
                let mut watched = current.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                if !relevance.is_relevant(&watched, event) {
                    return;
                }
                let fresh = Store::from_inner(inner).get_node_at(&path);
                if let Some(fresh) = &fresh {
                    *watched = fresh.clone();
                }
                fresh
            };
            callback(event, fresh);
        };
        Ok(self.subscribe(observer))
    }

    /// Install a plugin.
    pub fn use_plugin<P: StorePlugin + ?Sized>(&self, plugin: &P) -> ArborResult<()> {
        tracing::debug!(plugin = plugin.id(), "installing store plugin");
        plugin.configure(self)
    }

    /// True when both handles point at the same store.
    pub fn ptr_eq(&self, other: &Store) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("config", &self.inner.config)
            .field("state", &self.state())
            .finish()
    }
}
