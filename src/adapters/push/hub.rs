//! Push Hub - Broadcast Channel for Dashboard Clients
//!
//! Every published `PushEvent` reaches all receivers subscribed at the
//! time of publishing. Slow receivers lag and skip events rather than
//! blocking publishers.

use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::events::PushEvent;
use crate::ports::publisher::EventPublisher;

/// Broadcast hub shared by the background jobs and the `/ws` endpoint.
#[derive(Debug, Clone)]
pub struct PushHub {
    tx: broadcast::Sender<PushEvent>,
}

impl PushHub {
    /// Create a hub buffering up to `capacity` events per receiver.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Get a receiver for all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<PushEvent> {
        self.tx.subscribe()
    }
}

impl EventPublisher for PushHub {
    fn publish(&self, event: PushEvent) -> usize {
        let kind = event.kind();
        // Err only means nobody is listening.
        let reached = self.tx.send(event).unwrap_or(0);
        debug!(event = kind, subscribers = reached, "Push event published");
        reached
    }

    fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
