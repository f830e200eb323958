//! Market Data Port - Third-party Market Snapshot Interface
//!
//! Defines the trait for pulling the current top-of-market snapshot
//! and whole-market figures from an external provider (CoinGecko
//! today). The sync job only depends on this trait, never on HTTP
//! details.

use async_trait::async_trait;

use crate::domain::models::{MarketSummary, NewCryptocurrency};

/// Trait for market data providers.
#[async_trait]
pub trait MarketDataSource: Send + Sync + 'static {
  /// Fetch the top `per_page` coins by market cap as upsert payloads.
  async fn fetch_markets(
    &self,
    per_page: u32,
  ) -> anyhow::Result<Vec<NewCryptocurrency>>;

  /// Fetch whole-market figures (total cap, volume, dominance).
  async fn fetch_global(&self) -> anyhow::Result<MarketSummary>;

  /// Check if the provider is reachable.
  async fn is_healthy(&self) -> bool;
}
