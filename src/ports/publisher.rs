//! Event Publisher Port - Push Notification Interface
//!
//! Background jobs announce fresh data through this trait; the push
//! adapter fans events out to connected WebSocket clients.

use crate::domain::events::PushEvent;

/// Trait for push channels.
pub trait EventPublisher: Send + Sync + 'static {
  /// Publish an event to every current subscriber.
  ///
  /// Returns the number of subscribers reached. Publishing with no
  /// subscribers is not an error.
  fn publish(&self, event: PushEvent) -> usize;

  /// Number of currently connected subscribers.
  fn subscriber_count(&self) -> usize;
}
