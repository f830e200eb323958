//! Market Sync - Periodic Market Data Ingestion
//!
//! Pulls the top-of-market snapshot from the market data provider,
//! upserts every coin into the store, appends a price history point
//! for each coin that reported a price, refreshes the cached
//! whole-market summary, then tells connected clients that fresh data
//! landed.
//!
//! A failed coin poll leaves the store untouched and is retried on the
//! next tick. A failed summary fetch only keeps the previous summary.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, instrument, warn};

use crate::adapters::metrics::{HealthState, MetricsRegistry};
use crate::config::MarketDataConfig;
use crate::domain::events::PushEvent;
use crate::domain::models::NewPricePoint;
use crate::ports::market_data::MarketDataSource;
use crate::ports::publisher::EventPublisher;
use crate::ports::storage::Storage;

/// Outcome of a single successful sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
  /// Cryptocurrencies upserted.
  pub upserted: usize,
  /// Price history points appended.
  pub recorded: usize,
  /// Whether the whole-market summary was replaced.
  pub summary_refreshed: bool,
  /// Push subscribers that received the `price_update`.
  pub notified: usize,
}

/// Polling job feeding the store from the market data provider.
pub struct MarketSync<M: ?Sized, S: ?Sized, P: ?Sized> {
  /// Market data provider.
  source: Arc<M>,
  /// Tracker state.
  storage: Arc<S>,
  /// Push channel for `price_update`.
  publisher: Arc<P>,
  /// Prometheus metrics.
  metrics: Arc<MetricsRegistry>,
  /// Readiness flags.
  health: Arc<HealthState>,
  /// Coins requested per poll.
  per_page: u32,
  /// Delay between polls.
  poll_interval: Duration,
}

impl<M, S, P> MarketSync<M, S, P>
where
  M: MarketDataSource + ?Sized,
  S: Storage + ?Sized,
  P: EventPublisher + ?Sized,
{
  /// Create a new sync job.
  pub fn new(
    source: Arc<M>,
    storage: Arc<S>,
    publisher: Arc<P>,
    metrics: Arc<MetricsRegistry>,
    health: Arc<HealthState>,
    config: &MarketDataConfig,
  ) -> Self {
    Self {
      source,
      storage,
      publisher,
      metrics,
      health,
      per_page: config.per_page,
      poll_interval: Duration::from_secs(config.poll_interval_seconds),
    }
  }

  /// Fetch, store and announce one market snapshot.
  #[instrument(skip(self), name = "market_sync")]
  pub async fn sync_once(&self) -> Result<SyncReport> {
    let markets = self
      .source
      .fetch_markets(self.per_page)
      .await
      .context("Market data fetch failed")?;

    let mut report = SyncReport::default();

    for market in markets {
      // Record the freshly reported price, not whatever the merge kept.
      let reported_price = market.market.current_price;
      let crypto = self.storage.upsert_cryptocurrency(market).await?;
      report.upserted += 1;

      if let Some(price) = reported_price {
        self
          .storage
          .add_price_history(NewPricePoint {
            crypto_id: crypto.id,
            price,
          })
          .await?;
        report.recorded += 1;
      } else {
        debug!(crypto_id = %crypto.id, "No price reported, history not extended");
      }
    }

    match self.source.fetch_global().await {
      Ok(summary) => {
        self.storage.set_market_summary(summary).await?;
        report.summary_refreshed = true;
      }
      Err(e) => warn!(error = %e, "Global market fetch failed, keeping previous summary"),
    }

    report.notified = self
      .publisher
      .publish(PushEvent::price_update(report.upserted, Utc::now()));

    Ok(report)
  }

  /// Run the polling loop until shutdown.
  ///
  /// The first poll happens immediately.
  #[instrument(skip(self, shutdown_rx), name = "market_sync_loop")]
  pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
    info!(
      per_page = self.per_page,
      interval_secs = self.poll_interval.as_secs(),
      "Market sync started"
    );

    if !self.source.is_healthy().await {
      warn!("Market data provider unreachable at startup, polling anyway");
    }

    let mut ticker = interval(self.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
      tokio::select! {
        biased;
        _ = shutdown_rx.recv() => {
          info!("Market sync shutting down");
          return Ok(());
        }
        _ = ticker.tick() => {
          self.tick().await;
        }
      }
    }
  }

  /// One loop iteration: sync and record the outcome.
  async fn tick(&self) {
    match self.sync_once().await {
      Ok(report) => {
        self.metrics.market_polls.with_label_values(&["ok"]).inc();
        self
          .metrics
          .cryptocurrencies_tracked
          .set(i64::try_from(report.upserted).unwrap_or(i64::MAX));
        self
          .metrics
          .price_points_recorded
          .inc_by(report.recorded as u64);
        self.health.set_market_data(true);
        info!(
          upserted = report.upserted,
          recorded = report.recorded,
          summary = report.summary_refreshed,
          notified = report.notified,
          "Market snapshot stored"
        );
      }
      Err(e) => {
        self.metrics.market_polls.with_label_values(&["error"]).inc();
        self.health.set_market_data(false);
        warn!(error = %e, "Market sync failed, retrying next tick");
      }
    }
    self.health.set_store(self.storage.is_healthy().await);
  }
}
