//! CoinGecko Adapter - Third-party Market Data
//!
//! REST client for the public CoinGecko v3 API and the response types
//! it decodes. Implements the `MarketDataSource` port.

pub mod client;
pub mod types;

pub use client::{CoinGeckoClient, CoinGeckoConfig};
