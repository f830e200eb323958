//! Storage Port - Tracker State Interface
//!
//! Defines the trait the API layer and background jobs use to read and
//! write users, cryptocurrencies, watchlists, price alerts, price
//! history and the cached whole-market summary. The in-memory adapter is the only implementation today; a
//! durable backend can be swapped in behind the same trait without
//! touching call sites.
//!
//! Contract shared by every implementation:
//! - Lookups by identifier return `None` / an empty `Vec`, never an error.
//! - Joins against cryptocurrencies silently drop rows whose
//!   cryptocurrency no longer exists.
//! - Writes succeed once the payload is structurally valid; validating
//!   payloads is the caller's job.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::models::{
  Cryptocurrency, MarketSummary, NewCryptocurrency, NewPriceAlert, NewPricePoint, NewUser,
  NewWatchlistEntry, PriceAlert, PriceAlertPatch, PriceAlertWithCrypto,
  PricePoint, User, WatchlistEntry, WatchlistItem,
};

/// Default page size for `get_cryptocurrencies`.
pub const DEFAULT_CRYPTO_LIMIT: usize = 100;

/// Trait for tracker state providers.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
  // ── Users ───────────────────────────────────────────────

  /// Look up a user by id.
  async fn get_user(&self, id: &str) -> anyhow::Result<Option<User>>;

  /// Look up a user by exact username.
  async fn get_user_by_username(
    &self,
    username: &str,
  ) -> anyhow::Result<Option<User>>;

  /// Create a user with a fresh id.
  ///
  /// Username uniqueness is NOT enforced here; callers pre-check with
  /// `get_user_by_username`.
  async fn create_user(&self, user: NewUser) -> anyhow::Result<User>;

  // ── Cryptocurrencies ────────────────────────────────────

  /// All cryptocurrencies ordered by ascending market-cap rank
  /// (insertion order on ties), truncated to `limit`
  /// (`DEFAULT_CRYPTO_LIMIT` when `None`).
  async fn get_cryptocurrencies(
    &self,
    limit: Option<usize>,
  ) -> anyhow::Result<Vec<Cryptocurrency>>;

  /// Look up a single cryptocurrency by slug.
  async fn get_cryptocurrency(
    &self,
    id: &str,
  ) -> anyhow::Result<Option<Cryptocurrency>>;

  /// Insert, or merge into the existing record with the same id.
  ///
  /// Present market figures override, absent ones keep their prior
  /// value, and `last_updated` is always refreshed.
  async fn upsert_cryptocurrency(
    &self,
    crypto: NewCryptocurrency,
  ) -> anyhow::Result<Cryptocurrency>;

  /// Case-insensitive substring search on name or symbol.
  async fn search_cryptocurrencies(
    &self,
    query: &str,
  ) -> anyhow::Result<Vec<Cryptocurrency>>;

  // ── Watchlists ──────────────────────────────────────────

  /// The user's watchlist joined with cryptocurrencies.
  async fn get_watchlist(
    &self,
    user_id: &str,
  ) -> anyhow::Result<Vec<WatchlistItem>>;

  /// Append a watchlist row. Duplicate (user, crypto) pairs are allowed.
  async fn add_to_watchlist(
    &self,
    entry: NewWatchlistEntry,
  ) -> anyhow::Result<WatchlistEntry>;

  /// Remove the first row matching (user, crypto). No-op when absent.
  async fn remove_from_watchlist(
    &self,
    user_id: &str,
    crypto_id: &str,
  ) -> anyhow::Result<()>;

  // ── Price alerts ────────────────────────────────────────

  /// All of the user's alerts joined with cryptocurrencies.
  async fn get_price_alerts(
    &self,
    user_id: &str,
  ) -> anyhow::Result<Vec<PriceAlertWithCrypto>>;

  /// Create an alert: active, untriggered, no trigger time.
  async fn create_price_alert(
    &self,
    alert: NewPriceAlert,
  ) -> anyhow::Result<PriceAlert>;

  /// Merge `patch` into an existing alert. `None` when the id is unknown.
  async fn update_price_alert(
    &self,
    id: &str,
    patch: PriceAlertPatch,
  ) -> anyhow::Result<Option<PriceAlert>>;

  /// Delete an alert. No-op when absent.
  async fn delete_price_alert(&self, id: &str) -> anyhow::Result<()>;

  /// Every active, untriggered alert joined with its cryptocurrency.
  ///
  /// This is the feed the alert evaluator polls.
  async fn get_active_price_alerts(
    &self,
  ) -> anyhow::Result<Vec<PriceAlertWithCrypto>>;

  /// Mark an alert triggered at `at`, in one write, only if it is still
  /// pending and its condition holds against the current cryptocurrency.
  ///
  /// Returns the updated alert joined with that cryptocurrency, or `None`
  /// when the alert is gone, paused, already triggered, retargeted out of
  /// range, or orphaned.
  async fn trigger_price_alert(
    &self,
    id: &str,
    at: DateTime<Utc>,
  ) -> anyhow::Result<Option<PriceAlertWithCrypto>>;

  // ── Price history ───────────────────────────────────────

  /// Record a price observation timestamped now.
  async fn add_price_history(
    &self,
    point: NewPricePoint,
  ) -> anyhow::Result<PricePoint>;

  /// Points for `crypto_id` from the last `hours`, oldest first.
  async fn get_price_history(
    &self,
    crypto_id: &str,
    hours: u32,
  ) -> anyhow::Result<Vec<PricePoint>>;

  // ── Market summary ──────────────────────────────────────

  /// The last whole-market snapshot, if any sync has stored one.
  async fn get_market_summary(&self) -> anyhow::Result<Option<MarketSummary>>;

  /// Replace the whole-market snapshot.
  async fn set_market_summary(&self, summary: MarketSummary) -> anyhow::Result<()>;

  /// Check if the backing store is usable.
  async fn is_healthy(&self) -> bool;
}
