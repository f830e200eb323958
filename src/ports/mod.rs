//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases and API layer
//! require from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `Storage`: Tracker state (users, markets, watchlists, alerts, history)
//! - `MarketDataSource`: Third-party market snapshots
//! - `EventPublisher`: Push notifications to connected clients

pub mod market_data;
pub mod publisher;
pub mod storage;

pub use market_data::MarketDataSource;
pub use publisher::EventPublisher;
pub use storage::Storage;
