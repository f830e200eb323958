//! Alert Evaluator - Periodic Price Alert Checks
//!
//! Polls the store for active, untriggered alerts, checks each one
//! against its cryptocurrency's latest market snapshot and marks the
//! ones whose condition holds as triggered. Every fired alert is pushed
//! to connected clients.
//!
//! Alerts are one-shot: once triggered they drop out of the active feed
//! and are never re-armed here. The store re-checks each hit under its
//! write lock, so an alert paused or retargeted mid-pass is left alone.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, instrument, warn};

use crate::adapters::metrics::MetricsRegistry;
use crate::config::AlertsConfig;
use crate::domain::events::PushEvent;
use crate::domain::models::PriceAlertWithCrypto;
use crate::ports::publisher::EventPublisher;
use crate::ports::storage::Storage;

/// Polling job flipping satisfied alerts to triggered.
pub struct AlertEvaluator<S: ?Sized, P: ?Sized> {
  /// Tracker state.
  storage: Arc<S>,
  /// Push channel for `alert_triggered`.
  publisher: Arc<P>,
  /// Prometheus metrics.
  metrics: Arc<MetricsRegistry>,
  /// Delay between evaluation passes.
  evaluation_interval: Duration,
}

impl<S, P> AlertEvaluator<S, P>
where
  S: Storage + ?Sized,
  P: EventPublisher + ?Sized,
{
  /// Create a new evaluator.
  pub fn new(
    storage: Arc<S>,
    publisher: Arc<P>,
    metrics: Arc<MetricsRegistry>,
    config: &AlertsConfig,
  ) -> Self {
    Self {
      storage,
      publisher,
      metrics,
      evaluation_interval: Duration::from_secs(config.evaluation_interval_seconds),
    }
  }

  /// Evaluate every active alert once. Returns how many fired.
  #[instrument(skip(self), name = "alert_evaluation")]
  pub async fn evaluate_once(&self) -> Result<usize> {
    let active = self.storage.get_active_price_alerts().await?;
    self.metrics.alerts_evaluated.inc_by(active.len() as u64);

    let mut triggered = 0;

    for PriceAlertWithCrypto { alert, crypto } in active {
      if !alert.should_trigger(&crypto) {
        continue;
      }

      let now = Utc::now();
      let Some(PriceAlertWithCrypto {
        alert: updated,
        crypto: current,
      }) = self.storage.trigger_price_alert(&alert.id, now).await?
      else {
        debug!(alert_id = %alert.id, "Alert changed before it could be marked");
        continue;
      };

      let observed = updated.alert_type.observed(&current);
      let price = current.market.current_price;
      info!(
        alert_id = %updated.id,
        user_id = %updated.user_id,
        crypto_id = %updated.crypto_id,
        alert_type = %updated.alert_type,
        target = %updated.target_value,
        observed = ?observed,
        "Price alert triggered"
      );

      self
        .metrics
        .alerts_triggered
        .with_label_values(&[updated.alert_type.as_str()])
        .inc();
      self
        .publisher
        .publish(PushEvent::alert_triggered(&updated, price, now));
      triggered += 1;
    }

    Ok(triggered)
  }

  /// Run the evaluation loop until shutdown.
  #[instrument(skip(self, shutdown_rx), name = "alert_evaluation_loop")]
  pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
    info!(
      interval_secs = self.evaluation_interval.as_secs(),
      "Alert evaluator started"
    );

    let mut ticker = interval(self.evaluation_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
      tokio::select! {
        biased;
        _ = shutdown_rx.recv() => {
          info!("Alert evaluator shutting down");
          return Ok(());
        }
        _ = ticker.tick() => {
          match self.evaluate_once().await {
            Ok(0) => debug!("No alerts triggered"),
            Ok(n) => info!(triggered = n, "Alert pass complete"),
            Err(e) => warn!(error = %e, "Alert evaluation failed"),
          }
        }
      }
    }
  }
}
