//! Push Adapters - Fan-out of Live Events
//!
//! `PushHub` implements the `EventPublisher` port on top of a tokio
//! broadcast channel. The HTTP layer's `/ws` endpoint subscribes one
//! receiver per connected client.

pub mod hub;

pub use hub::PushHub;
