//! Reactive copy-on-write state tree.
//!
//! `arbor-state` keeps application state as an immutable tree of values and
//! hands out path-aware [`Node`] views over it. Writing through a node never
//! changes the value it wraps: the store copies the ancestor chain, installs
//! a new root, and notifies subscribers with a [`MutationEvent`].
//!
//! # Core Concepts
//!
//! - **Store**: Owner of the current root, the node cache and the subscribers
//! - **Node**: Snapshot view at a path, with typed views for objects, lists
//!   and maps
//! - **Path**: Location of a node, made of key and index segments
//! - **MutationEvent**: Record of one installed mutation
//! - **Lifecycle**: Detach, attach, merge and reload for every node kind
//! - **Collection**: Repository view over a keyed map of records
//!
//! # Structural Sharing
//!
//! ```
//! use arbor_state::{path, Store};
//! use serde_json::json;
//!
//! let store = Store::new(json!({"todos": {"a": {"text": "x"}}, "user": {"name": "l"}}));
//! let before = store.state();
//!
//! let todo = store.get_node_at(&path!("todos", "a")).unwrap();
//! todo.set("text", "y").unwrap();
//!
//! let after = store.state();
//! assert!(!after.same(&before));
//! assert!(after.get("user").unwrap().same(before.get("user").unwrap()));
//! assert_eq!(before.at_path(&path!("todos", "a", "text")).unwrap().as_str(), Some("x"));
//! ```
//!
//! # Subscriptions
//!
//! ```
//! use arbor_state::{path, watch, Store};
//! use serde_json::json;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let store = Store::new(json!({"todos": {}, "other": {}}));
//! let todos = store.get_node_at(&path!("todos")).unwrap();
//!
//! let hits = Arc::new(AtomicUsize::new(0));
//! let counter = hits.clone();
//! let _sub = store
//!     .watch(&todos, watch::targets(), move |_, _| {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     })
//!     .unwrap();
//!
//! todos.set("1", json!({"text": "a"})).unwrap();
//! store.get_node_at(&path!("other")).unwrap().set("x", 1).unwrap();
//!
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//! ```

mod collection;
mod engine;
mod error;
mod event;
mod handlers;
mod lifecycle;
pub mod model;
mod node;
mod path;
mod plugin;
mod store;
mod subscriptions;
mod value;
pub mod watch;

// Core types
pub use error::{value_type_name, ArborError, ArborResult};
pub use event::{MutationEvent, MutationMetadata, Operation};
pub use handlers::{classify, is_proxiable, Kind, ListNode, MapNode, ObjectNode};
pub use node::{Child, Node};
pub use path::{Path, Seg};
pub use store::{Store, StoreConfig, DEFAULT_MAX_NOTIFICATION_DEPTH};
pub use value::{List, Map, Object, Opaque, Value};

// Behaviors and extensions
pub use collection::{Collection, DEFAULT_ID_KEY};
pub use lifecycle::Lifecycle;
pub use model::Model;
pub use plugin::StorePlugin;
pub use subscriptions::{Observer, Subscription, SubscriptionId};
pub use watch::Relevance;

// Re-export derive macro when feature is enabled
#[cfg(feature = "derive")]
pub use arbor_state_derive::Model;
