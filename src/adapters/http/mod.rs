//! HTTP API - REST Endpoints and WebSocket Push
//!
//! axum router over the storage port. Handlers validate input, call
//! the store and map absence to 404. The `/ws` endpoint streams push
//! hub events to dashboard clients.

pub mod alerts;
pub mod cryptocurrencies;
pub mod error;
pub mod market;
pub mod users;
pub mod validation;
pub mod watchlist;
pub mod ws;

use std::sync::Arc;

use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;

use crate::adapters::metrics::MetricsRegistry;
use crate::adapters::push::PushHub;
use crate::ports::storage::Storage;

pub use error::{ApiError, ApiResult};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Storage>,
    pub hub: PushHub,
    pub metrics: Arc<MetricsRegistry>,
}

impl AppState {
    pub fn new(store: Arc<dyn Storage>, hub: PushHub, metrics: Arc<MetricsRegistry>) -> Self {
        Self { store, hub, metrics }
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/users", post(users::create_user))
        .route("/api/users/:id", get(users::get_user))
        .route("/api/cryptocurrencies", get(cryptocurrencies::list_cryptocurrencies))
        .route("/api/cryptocurrencies/search", get(cryptocurrencies::search_cryptocurrencies))
        .route("/api/cryptocurrencies/:id", get(cryptocurrencies::get_cryptocurrency))
        .route("/api/cryptocurrencies/:id/history", get(cryptocurrencies::get_price_history))
        .route("/api/market/summary", get(market::get_market_summary))
        .route("/api/watchlist", post(watchlist::add_to_watchlist))
        .route("/api/watchlist/:user_id", get(watchlist::get_watchlist))
        .route(
            "/api/watchlist/:user_id/:crypto_id",
            axum::routing::delete(watchlist::remove_from_watchlist),
        )
        .route("/api/alerts", post(alerts::create_price_alert))
        // GET takes a user id, PATCH and DELETE an alert id.
        .route(
            "/api/alerts/:id",
            get(alerts::get_price_alerts)
                .patch(alerts::update_price_alert)
                .delete(alerts::delete_price_alert),
        )
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
}

/// Serve the API on `listener` until shutdown.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!(address = %addr, "API server started");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await
        .context("API server error")?;

    Ok(())
}
