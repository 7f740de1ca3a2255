//! Broadcast dispatch
//!
//! Pushes each event to every registered subscriber, best-effort.
//! Delivery works snapshot-then-mutate: iterate a point-in-time copy,
//! collect the subscribers whose connection task is gone, and prune
//! them after the full pass so one dead peer never shadows the rest.

use crate::registry::SubscriberRegistry;
use async_trait::async_trait;
use myolink_core::{EventSink, SignalEvent};
use std::sync::Arc;

/// Fans events out to the registry's current membership.
pub struct Broadcaster {
    registry: Arc<SubscriberRegistry>,
}

impl Broadcaster {
    /// Create a broadcaster over a shared registry.
    pub fn new(registry: Arc<SubscriberRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver `event` to every subscriber, removing the ones whose
    /// delivery fails.
    pub fn broadcast(&self, event: SignalEvent) {
        let subscribers = self.registry.snapshot();
        if subscribers.is_empty() {
            return;
        }

        let mut failed = Vec::new();
        for subscriber in &subscribers {
            if subscriber.send(event).is_err() {
                failed.push(subscriber.id());
            }
        }

        for id in failed {
            if self.registry.remove(&id) {
                tracing::info!("Pruned unreachable subscriber {}", id);
            }
        }

        tracing::trace!(
            "Broadcast {} to {} subscribers",
            event,
            subscribers.len()
        );
    }
}

#[async_trait]
impl EventSink for Broadcaster {
    async fn publish(&self, event: SignalEvent) {
        self.broadcast(event);
    }
}
