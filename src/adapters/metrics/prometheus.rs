//! Prometheus Metrics Registry - Tracker Observability
//!
//! Registers and exposes Prometheus metrics for Grafana dashboards:
//! market polling outcomes, store growth, alert evaluation and push
//! channel fan-out.

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

/// Centralized Prometheus metrics for the tracker.
///
/// All metrics follow the naming convention `crypto_pulse_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Market data polls by outcome ("ok" / "error").
    pub market_polls: IntCounterVec,
    /// Cryptocurrencies refreshed by the last successful poll.
    pub cryptocurrencies_tracked: IntGauge,
    /// Price history points recorded.
    pub price_points_recorded: IntCounter,
    /// Active alerts examined by the evaluator.
    pub alerts_evaluated: IntCounter,
    /// Alerts that fired, by alert type.
    pub alerts_triggered: IntCounterVec,
    /// Currently connected WebSocket clients.
    pub push_clients: IntGauge,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let market_polls = IntCounterVec::new(
            Opts::new("crypto_pulse_market_polls_total", "Market data polls"),
            &["outcome"],
        )?;

        let cryptocurrencies_tracked = IntGauge::new(
            "crypto_pulse_cryptocurrencies_tracked",
            "Cryptocurrencies refreshed by the last successful poll",
        )?;

        let price_points_recorded = IntCounter::new(
            "crypto_pulse_price_points_recorded_total",
            "Price history points recorded",
        )?;

        let alerts_evaluated = IntCounter::new(
            "crypto_pulse_alerts_evaluated_total",
            "Active alerts examined by the evaluator",
        )?;

        let alerts_triggered = IntCounterVec::new(
            Opts::new("crypto_pulse_alerts_triggered_total", "Alerts that fired"),
            &["alert_type"],
        )?;

        let push_clients = IntGauge::new(
            "crypto_pulse_push_clients",
            "Connected WebSocket push clients",
        )?;

        registry.register(Box::new(market_polls.clone()))?;
        registry.register(Box::new(cryptocurrencies_tracked.clone()))?;
        registry.register(Box::new(price_points_recorded.clone()))?;
        registry.register(Box::new(alerts_evaluated.clone()))?;
        registry.register(Box::new(alerts_triggered.clone()))?;
        registry.register(Box::new(push_clients.clone()))?;

        Ok(Self {
            registry,
            market_polls,
            cryptocurrencies_tracked,
            price_points_recorded,
            alerts_evaluated,
            alerts_triggered,
            push_clients,
        })
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Serve Prometheus metrics on the configured bind address.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics);
                async move {
                    metrics.render().map_err(|e| {
                        warn!(error = %e, "Failed to encode metrics");
                        StatusCode::INTERNAL_SERVER_ERROR
                    })
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}
