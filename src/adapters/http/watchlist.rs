//! Watchlist endpoints. Removal is idempotent.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use crate::domain::models::{NewWatchlistEntry, WatchlistEntry, WatchlistItem};

use super::error::{ApiError, ApiResult};
use super::validation;
use super::AppState;

pub async fn get_watchlist(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<WatchlistItem>>> {
    Ok(Json(state.store.get_watchlist(&user_id).await?))
}

pub async fn add_to_watchlist(
    State(state): State<AppState>,
    payload: Result<Json<NewWatchlistEntry>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<WatchlistEntry>)> {
    let Json(entry) = payload?;
    validation::non_empty("userId", &entry.user_id)?;
    validation::non_empty("cryptoId", &entry.crypto_id)?;

    if state.store.get_cryptocurrency(&entry.crypto_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Cryptocurrency {}", entry.crypto_id)));
    }

    let entry = state.store.add_to_watchlist(entry).await?;
    info!(user_id = %entry.user_id, crypto_id = %entry.crypto_id, "Watchlist entry added");

    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn remove_from_watchlist(
    State(state): State<AppState>,
    Path((user_id, crypto_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state.store.remove_from_watchlist(&user_id, &crypto_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
