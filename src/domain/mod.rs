//! Domain layer - Core tracker entities and rules.
//!
//! Pure types and logic for the tracker (hexagonal architecture inner
//! ring): stored entities, insert/patch payloads, alert conditions and
//! push events. No I/O happens here.

pub mod alert;
pub mod events;
pub mod models;

// Re-export core types for convenience
pub use alert::AlertType;
pub use events::PushEvent;
pub use models::{
    CryptoId, Cryptocurrency, MarketData, MarketSummary, NewCryptocurrency, NewPriceAlert, NewPricePoint,
    NewUser, NewWatchlistEntry, PriceAlert, PriceAlertPatch, PriceAlertWithCrypto, PricePoint,
    RecordId, User, UserId, WatchlistEntry, WatchlistItem,
};
