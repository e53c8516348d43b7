//! Subscriber registry and synchronous event delivery.

use crate::event::MutationEvent;
use crate::store::StoreInner;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Callback invoked for every installed mutation.
pub type Observer = Arc<dyn Fn(&MutationEvent) + Send + Sync>;

/// Identifier of a registered observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn get(self) -> u64 {
        self.0
    }
}

pub(crate) struct Subscriptions {
    next_id: AtomicU64,
    observers: Mutex<Vec<(SubscriptionId, Observer)>>,
}

impl Subscriptions {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            observers: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn add(&self, observer: Observer) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, observer));
        id
    }

    pub(crate) fn remove(&self, id: SubscriptionId) -> bool {
        let mut observers = self.lock();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// Deliver `event` to every observer registered at call time, in
    /// registration order. Observers run outside the registry lock so they
    /// may subscribe, unsubscribe or mutate.
    pub(crate) fn notify(&self, event: &MutationEvent) {
        let snapshot: Vec<Observer> = self
            .lock()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in snapshot {
            observer(event);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionId, Observer)>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle returned by [`Store::subscribe`](crate::Store::subscribe).
///
/// Dropping the handle keeps the observer registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    store: Weak<StoreInner>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, store: Weak<StoreInner>) -> Self {
        Self { id, store }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove the observer. Returns `false` if it was already gone or the
    /// store has been dropped.
    pub fn unsubscribe(self) -> bool {
        self.store
            .upgrade()
            .is_some_and(|store| store.subscriptions.remove(self.id))
    }
}
