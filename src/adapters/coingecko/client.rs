//! CoinGecko HTTP Client - Rate-limited REST Market Data Client
//!
//! Wraps reqwest with a client-side rate limiter, retries and an
//! optional demo API key for the public CoinGecko v3 API. Implements
//! the `MarketDataSource` port.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client, Response, StatusCode};
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use super::types::{CoinGlobal, CoinMarket};
use crate::domain::models::{MarketSummary, NewCryptocurrency};
use crate::ports::market_data::MarketDataSource;

/// Header carrying a CoinGecko demo API key.
const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// Configuration for the CoinGecko client.
#[derive(Debug, Clone)]
pub struct CoinGeckoConfig {
  /// Base URL for the API (no trailing slash).
  pub base_url: String,
  /// Quote currency for prices ("usd").
  pub vs_currency: String,
  /// Request timeout.
  pub timeout: Duration,
  /// Maximum retries on transient errors.
  pub max_retries: u32,
  /// Base delay between retries (exponential backoff).
  pub retry_base_delay: Duration,
  /// Client-side request budget.
  pub requests_per_minute: u32,
  /// Optional demo API key (from COINGECKO_API_KEY).
  pub api_key: Option<String>,
}

impl Default for CoinGeckoConfig {
  fn default() -> Self {
    Self {
      base_url: "https://api.coingecko.com/api/v3".to_string(),
      vs_currency: "usd".to_string(),
      timeout: Duration::from_secs(10),
      max_retries: 3,
      retry_base_delay: Duration::from_millis(500),
      requests_per_minute: 30,
      api_key: None,
    }
  }
}

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`,
/// saturating instead of overflowing.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
  base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
}

/// Rate-limited HTTP client for CoinGecko.
pub struct CoinGeckoClient {
  /// Underlying HTTP client.
  http: Client,
  /// Client configuration.
  config: CoinGeckoConfig,
  /// Keeps us under the provider's free-tier budget.
  limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl CoinGeckoClient {
  /// Create a new CoinGecko client.
  pub fn new(config: CoinGeckoConfig) -> Result<Self> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(2)
      .user_agent(concat!("crypto-pulse/", env!("CARGO_PKG_VERSION")))
      .build()
      .context("Failed to build HTTP client")?;

    let per_minute =
      NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);
    let limiter = RateLimiter::direct(Quota::per_minute(per_minute));

    Ok(Self {
      http,
      config,
      limiter,
    })
  }

  /// Query string for `/coins/markets`.
  fn markets_query(&self, per_page: u32) -> Vec<(&'static str, String)> {
    vec![
      ("vs_currency", self.config.vs_currency.clone()),
      ("order", "market_cap_desc".to_string()),
      ("per_page", per_page.to_string()),
      ("page", "1".to_string()),
      ("sparkline", "false".to_string()),
      ("price_change_percentage", "24h,7d".to_string()),
    ]
  }

  /// Execute a GET with rate limiting and retries.
  async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Response> {
    let url = format!("{}{}", self.config.base_url, path);
    let mut last_error = None;

    for attempt in 0..=self.config.max_retries {
      if attempt > 0 {
        let delay = backoff_delay(self.config.retry_base_delay, attempt);
        debug!(attempt, delay_ms = delay.as_millis(), "Retrying request");
        sleep(delay).await;
      }

      self.limiter.until_ready().await;

      let mut request = self.http.get(&url).query(query);
      if let Some(key) = &self.config.api_key {
        request = request.header(API_KEY_HEADER, key);
      }

      match request.send().await {
        Ok(response) => match response.status() {
          StatusCode::OK => return Ok(response),
          StatusCode::TOO_MANY_REQUESTS => {
            warn!("Rate limited by CoinGecko, backing off");
            sleep(Duration::from_secs(2)).await;
            last_error = Some(anyhow::anyhow!("Rate limited"));
          }
          status if status.is_server_error() => {
            warn!(status = %status, "Server error, retrying");
            last_error = Some(anyhow::anyhow!("Server error: {status}"));
          }
          status => {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("CoinGecko API error {status}: {body}"));
          }
        },
        Err(e) => {
          warn!(error = %e, attempt, "Request failed");
          last_error = Some(e.into());
        }
      }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Max retries exceeded")))
  }
}

#[async_trait]
impl MarketDataSource for CoinGeckoClient {
  #[instrument(skip(self))]
  async fn fetch_markets(&self, per_page: u32) -> Result<Vec<NewCryptocurrency>> {
    let response = self
      .get("/coins/markets", &self.markets_query(per_page))
      .await?;

    let rows: Vec<CoinMarket> = response
      .json()
      .await
      .context("Failed to parse /coins/markets response")?;

    debug!(rows = rows.len(), "Fetched market snapshot");
    Ok(rows.into_iter().map(NewCryptocurrency::from).collect())
  }

  #[instrument(skip(self))]
  async fn fetch_global(&self) -> Result<MarketSummary> {
    let response = self.get("/global", &[]).await?;

    let global: CoinGlobal = response
      .json()
      .await
      .context("Failed to parse /global response")?;

    Ok(global.into_summary(&self.config.vs_currency, Utc::now()))
  }

  async fn is_healthy(&self) -> bool {
    self.get("/ping", &[]).await.is_ok()
  }
}
