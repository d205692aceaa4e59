//! Registry of live streaming subscribers.

use std::collections::HashMap;
use std::sync::Arc;

use obsentra_types::SubscriberId;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::subscriber::Subscriber;

/// Tracks every registered subscriber by identity.
///
/// The registry is the only long-lived owner of subscriber handles. The
/// mediator iterates a [`snapshot`](Self::snapshot), so registrations and
/// removals may happen while a broadcast is in flight.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: RwLock<HashMap<SubscriberId, Arc<dyn Subscriber>>>,
}

impl SubscriberRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber. There is no size limit.
    pub fn register(&self, subscriber: Arc<dyn Subscriber>) {
        let id = subscriber.id();
        let previous = self.subscribers.write().insert(id, subscriber);
        if previous.is_some() {
            warn!(subscriber_id = %id, "subscriber re-registered, previous handle replaced");
        } else {
            debug!(subscriber_id = %id, "subscriber registered");
        }
    }

    /// Remove a subscriber, returning its handle if it was present.
    ///
    /// Removing an unknown or already removed subscriber is a no-op.
    pub fn unregister(&self, id: SubscriberId) -> Option<Arc<dyn Subscriber>> {
        let removed = self.subscribers.write().remove(&id);
        if removed.is_some() {
            debug!(subscriber_id = %id, "subscriber unregistered");
        }
        removed
    }

    /// Point-in-time copy of the registered subscribers.
    pub fn snapshot(&self) -> Vec<Arc<dyn Subscriber>> {
        self.subscribers.read().values().cloned().collect()
    }

    /// Whether a subscriber is currently registered.
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.read().contains_key(&id)
    }

    /// Number of registered subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Whether no subscribers are registered.
    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("len", &self.len())
            .finish()
    }
}
