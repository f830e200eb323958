//! CoinGecko API Response Types
//!
//! Deserialization types for the `/coins/markets` and `/global`
//! endpoints and their conversion into domain types. CoinGecko reports numbers as
//! JSON floats; they become `Decimal` at this boundary.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use serde::Deserialize;

use crate::domain::models::{MarketData, MarketSummary, NewCryptocurrency};

/// One row of `GET /coins/markets`.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinMarket {
  /// Coin slug (e.g. "bitcoin").
  pub id: String,
  /// Ticker symbol, lowercase (e.g. "btc").
  pub symbol: String,
  /// Display name.
  pub name: String,
  /// Logo URL.
  pub image: Option<String>,
  pub current_price: Option<f64>,
  pub market_cap: Option<f64>,
  pub market_cap_rank: Option<u32>,
  pub fully_diluted_valuation: Option<f64>,
  pub total_volume: Option<f64>,
  pub high_24h: Option<f64>,
  pub low_24h: Option<f64>,
  pub price_change_24h: Option<f64>,
  pub price_change_percentage_24h: Option<f64>,
  /// Present only when requested via `price_change_percentage=7d`.
  pub price_change_percentage_7d_in_currency: Option<f64>,
  pub market_cap_change_24h: Option<f64>,
  pub market_cap_change_percentage_24h: Option<f64>,
  pub circulating_supply: Option<f64>,
  pub total_supply: Option<f64>,
  pub max_supply: Option<f64>,
  pub ath: Option<f64>,
  pub ath_change_percentage: Option<f64>,
  pub ath_date: Option<DateTime<Utc>>,
  pub atl: Option<f64>,
  pub atl_change_percentage: Option<f64>,
  pub atl_date: Option<DateTime<Utc>>,
}

fn dec(value: Option<f64>) -> Option<Decimal> {
  value.and_then(Decimal::from_f64)
}

impl From<CoinMarket> for NewCryptocurrency {
  fn from(m: CoinMarket) -> Self {
    Self {
      id: m.id,
      symbol: m.symbol,
      name: m.name,
      market: MarketData {
        image: m.image,
        current_price: dec(m.current_price),
        market_cap: dec(m.market_cap),
        market_cap_rank: m.market_cap_rank.map(|r| r.to_string()),
        fully_diluted_valuation: dec(m.fully_diluted_valuation),
        total_volume: dec(m.total_volume),
        high_24h: dec(m.high_24h),
        low_24h: dec(m.low_24h),
        price_change_24h: dec(m.price_change_24h),
        price_change_percentage_24h: dec(m.price_change_percentage_24h),
        price_change_percentage_7d: dec(m.price_change_percentage_7d_in_currency),
        market_cap_change_24h: dec(m.market_cap_change_24h),
        market_cap_change_percentage_24h: dec(m.market_cap_change_percentage_24h),
        circulating_supply: dec(m.circulating_supply),
        total_supply: dec(m.total_supply),
        max_supply: dec(m.max_supply),
        ath: dec(m.ath),
        ath_change_percentage: dec(m.ath_change_percentage),
        ath_date: m.ath_date,
        atl: dec(m.atl),
        atl_change_percentage: dec(m.atl_change_percentage),
        atl_date: m.atl_date,
      },
    }
  }
}

/// Body of `GET /global`.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinGlobal {
  pub data: GlobalData,
}

/// Whole-market figures. Money maps are keyed by quote currency,
/// `market_cap_percentage` by coin symbol.
#[derive(Debug, Clone, Deserialize)]
pub struct GlobalData {
  pub active_cryptocurrencies: Option<u32>,
  pub markets: Option<u32>,
  #[serde(default)]
  pub total_market_cap: HashMap<String, f64>,
  #[serde(default)]
  pub total_volume: HashMap<String, f64>,
  #[serde(default)]
  pub market_cap_percentage: HashMap<String, f64>,
  pub market_cap_change_percentage_24h_usd: Option<f64>,
  /// Unix seconds.
  pub updated_at: Option<i64>,
}

impl CoinGlobal {
  /// Pick out the figures for `vs_currency`.
  ///
  /// Falls back to `fetched_at` when the provider omits `updated_at`.
  pub fn into_summary(self, vs_currency: &str, fetched_at: DateTime<Utc>) -> MarketSummary {
    let d = self.data;
    let vs = vs_currency.to_lowercase();
    MarketSummary {
      active_cryptocurrencies: d.active_cryptocurrencies,
      markets: d.markets,
      total_market_cap: dec(d.total_market_cap.get(&vs).copied()),
      total_volume: dec(d.total_volume.get(&vs).copied()),
      market_cap_change_percentage_24h: dec(d.market_cap_change_percentage_24h_usd),
      btc_dominance: dec(d.market_cap_percentage.get("btc").copied()),
      eth_dominance: dec(d.market_cap_percentage.get("eth").copied()),
      updated_at: d
        .updated_at
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or(fetched_at),
    }
  }
}
