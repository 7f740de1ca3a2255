//! Subscriber membership tracking
//!
//! A mutex-guarded set of live subscribers, mutated by connection tasks
//! as peers arrive and depart, and iterated by the broadcaster. The
//! broadcaster always works from a [`snapshot`](SubscriberRegistry::snapshot)
//! so delivery to a slow peer never holds the registry lock.

use myolink_core::SignalEvent;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Unique identity of a registered subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

/// A registered subscriber: an id plus the channel into its
/// connection task.
///
/// The registry entry does not own the network connection; it only
/// addresses the task that does. A send fails exactly when that task
/// has gone away.
#[derive(Clone)]
pub struct Subscriber {
    id: SubscriberId,
    tx: mpsc::UnboundedSender<SignalEvent>,
}

impl Subscriber {
    /// Wrap a channel sender as a subscriber with a fresh id.
    pub fn new(tx: mpsc::UnboundedSender<SignalEvent>) -> Self {
        Self {
            id: SubscriberId::new(),
            tx,
        }
    }

    /// This subscriber's id
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Hand an event to the connection task.
    pub fn send(
        &self,
        event: SignalEvent,
    ) -> Result<(), mpsc::error::SendError<SignalEvent>> {
        self.tx.send(event)
    }
}

/// Thread-safe set of active subscribers
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl SubscriberRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a subscriber backed by a fresh channel and add it.
    ///
    /// Returns the id (for later removal) and the receiving end for the
    /// connection task to drain.
    pub fn register(&self) -> (SubscriberId, mpsc::UnboundedReceiver<SignalEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber = Subscriber::new(tx);
        let id = subscriber.id();
        self.add(subscriber);
        (id, rx)
    }

    /// Add a subscriber. Adding an id that is already present is a no-op.
    pub fn add(&self, subscriber: Subscriber) {
        let mut subscribers = self.subscribers.lock();
        if subscribers.iter().any(|s| s.id == subscriber.id) {
            tracing::debug!("Subscriber {} already registered", subscriber.id);
            return;
        }
        subscribers.push(subscriber);
        tracing::info!("Subscriber registered ({} active)", subscribers.len());
    }

    /// Remove a subscriber by id. Returns whether an entry was removed.
    pub fn remove(&self, id: &SubscriberId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != *id);
        let removed = subscribers.len() < before;
        if removed {
            tracing::info!("Subscriber {} removed ({} active)", id, subscribers.len());
        }
        removed
    }

    /// Point-in-time copy of the membership, safe to iterate without
    /// holding the lock.
    pub fn snapshot(&self) -> Vec<Subscriber> {
        self.subscribers.lock().clone()
    }

    /// Number of active subscribers
    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Whether no subscribers are registered
    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_then_remove_leaves_no_entry() {
        let registry = SubscriberRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let subscriber = Subscriber::new(tx);
        let id = subscriber.id();

        registry.add(subscriber);
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(&id));
        assert!(registry.snapshot().iter().all(|s| s.id() != id));
        assert!(registry.is_empty());

        // Double remove reports nothing removed
        assert!(!registry.remove(&id));
    }

    #[test]
    fn test_duplicate_add_is_ignored() {
        let registry = SubscriberRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let subscriber = Subscriber::new(tx);

        registry.add(subscriber.clone());
        registry.add(subscriber);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_snapshot_is_detached_from_mutation() {
        let registry = SubscriberRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let subscriber = Subscriber::new(tx);
        let id = subscriber.id();
        registry.add(subscriber);

        let snapshot = registry.snapshot();
        registry.remove(&id);

        assert_eq!(snapshot.len(), 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_register_wires_the_channel() {
        let registry = SubscriberRegistry::new();
        let (_id, mut rx) = registry.register();

        let snapshot = registry.snapshot();
        snapshot[0].send(SignalEvent::Active).unwrap();
        assert_eq!(rx.recv().await, Some(SignalEvent::Active));
    }
}
