//! Store plugins.
//!
//! A plugin receives the store once, at installation, and hooks itself in
//! through the public API: usually a subscription for persistence or logging
//! and, for rehydration, [`Store::set_root`].

use crate::{ArborResult, Store};

/// Extension installed with [`Store::use_plugin`].
pub trait StorePlugin: Send + Sync {
    /// Stable identifier, used in logs.
    fn id(&self) -> &str;

    /// Wire the plugin into `store`.
    fn configure(&self, store: &Store) -> ArborResult<()>;
}
