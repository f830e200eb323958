//! crypto-pulse - Entry Point
//!
//! Initializes configuration and logging, wires the store, market data
//! client and push hub, then runs the background jobs next to the API
//! server until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Create MemStorage, PushHub, metrics registry, health state
//! 4. Create CoinGeckoClient (API key from COINGECKO_API_KEY)
//! 5. Spawn metrics server and health server (/live + /ready)
//! 6. Spawn MarketSync and AlertEvaluator loops
//! 7. Spawn the API server (REST + /ws)
//! 8. Wait for SIGINT → broadcast shutdown → drain tasks with timeouts

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crypto_pulse::adapters::coingecko::{CoinGeckoClient, CoinGeckoConfig};
use crypto_pulse::adapters::http::{self, AppState};
use crypto_pulse::adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use crypto_pulse::adapters::persistence::MemStorage;
use crypto_pulse::adapters::push::PushHub;
use crypto_pulse::config;
use crypto_pulse::usecases::{AlertEvaluator, MarketSync};

/// Environment variable holding the optional CoinGecko demo API key.
const API_KEY_ENV: &str = "COINGECKO_API_KEY";

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration from config.toml ──────────────
    let config = config::loader::load_config("config.toml")
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(&config.app.log_level)
                }),
        )
        .json()
        .init();

    info!(
        name = %config.app.name,
        version = env!("CARGO_PKG_VERSION"),
        bind = %config.server.bind_address,
        per_page = config.market_data.per_page,
        alerts = config.alerts.enabled,
        "Starting crypto-pulse"
    );

    // ── 3. Shutdown channel and shared state ────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

    let store = Arc::new(MemStorage::new());
    let hub = PushHub::new(config.server.push_buffer);
    let publisher = Arc::new(hub.clone());
    let metrics = Arc::new(
        MetricsRegistry::new().context("Failed to register metrics")?,
    );
    let health = Arc::new(HealthState::new());

    // ── 4. Create CoinGecko client with retry + rate limit ──
    let api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());
    if api_key.is_none() {
        warn!("{API_KEY_ENV} not set, using the keyless public tier");
    }
    let md = &config.market_data;
    let source = Arc::new(
        CoinGeckoClient::new(CoinGeckoConfig {
            base_url: md.base_url.clone(),
            vs_currency: md.vs_currency.clone(),
            timeout: Duration::from_secs(md.timeout_seconds),
            max_retries: md.max_retries,
            requests_per_minute: md.requests_per_minute,
            api_key,
            ..CoinGeckoConfig::default()
        })
        .context("Failed to create CoinGecko client")?,
    );

    let mut handles: Vec<(&'static str, JoinHandle<()>)> = Vec::new();

    // ── 5. Spawn metrics and health servers ─────────────────
    if config.metrics.enabled {
        let metrics_ref = Arc::clone(&metrics);
        let bind = config.metrics.bind_address.clone();
        let rx = shutdown_tx.subscribe();
        handles.push((
            "metrics",
            tokio::spawn(async move {
                if let Err(e) = metrics_ref.serve(bind, rx).await {
                    error!(error = %e, "Metrics server failed");
                }
            }),
        ));
    }

    let health_server = HealthServer::new(Arc::clone(&health), config.metrics.health_port);
    let rx = shutdown_tx.subscribe();
    handles.push((
        "health",
        tokio::spawn(async move {
            if let Err(e) = health_server.run(rx).await {
                error!(error = %e, "Health server failed");
            }
        }),
    ));

    // ── 6. Spawn background jobs ────────────────────────────
    let sync = MarketSync::new(
        source,
        Arc::clone(&store),
        Arc::clone(&publisher),
        Arc::clone(&metrics),
        Arc::clone(&health),
        &config.market_data,
    );
    let rx = shutdown_tx.subscribe();
    handles.push((
        "market_sync",
        tokio::spawn(async move {
            if let Err(e) = sync.run(rx).await {
                error!(error = %e, "Market sync task failed");
            }
        }),
    ));

    if config.alerts.enabled {
        let evaluator = AlertEvaluator::new(
            Arc::clone(&store),
            Arc::clone(&publisher),
            Arc::clone(&metrics),
            &config.alerts,
        );
        let rx = shutdown_tx.subscribe();
        handles.push((
            "alert_evaluator",
            tokio::spawn(async move {
                if let Err(e) = evaluator.run(rx).await {
                    error!(error = %e, "Alert evaluator task failed");
                }
            }),
        ));
    } else {
        warn!("Alert evaluation disabled by config");
    }

    // ── 7. Spawn API server ─────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;
    let state = AppState::new(store, hub, Arc::clone(&metrics));
    let rx = shutdown_tx.subscribe();
    handles.push((
        "api",
        tokio::spawn(async move {
            if let Err(e) = http::serve(listener, state, rx).await {
                error!(error = %e, "API server failed");
            }
        }),
    ));

    info!("All tasks spawned, tracker is running");

    // ── 8. Wait for SIGINT ──────────────────────────────────
    signal::ctrl_c()
        .await
        .context("Failed to listen for SIGINT")?;
    info!("SIGINT received, initiating graceful shutdown");

    // Readiness check → 503 while draining
    health.set_market_data(false);
    let _ = shutdown_tx.send(());

    for (name, handle) in handles {
        match tokio::time::timeout(Duration::from_secs(10), handle).await {
            Ok(Ok(())) => info!(task = name, "Task stopped"),
            Ok(Err(e)) => warn!(task = name, error = %e, "Task panicked"),
            Err(_) => warn!(task = name, "Task did not stop in time"),
        }
    }

    info!("Shutdown complete");
    Ok(())
}
