//! Cryptocurrency endpoints: ranked listing, search, single lookup and
//! price history.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::domain::models::{Cryptocurrency, PricePoint};

use super::error::{ApiError, ApiResult};
use super::validation;
use super::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub hours: Option<u32>,
}

/// Cryptocurrencies by market-cap rank.
pub async fn list_cryptocurrencies(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Cryptocurrency>>> {
    let Query(query) = query?;
    let limit = validation::list_limit(query.limit)?;

    Ok(Json(state.store.get_cryptocurrencies(limit).await?))
}

pub async fn search_cryptocurrencies(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Cryptocurrency>>> {
    let Query(query) = query?;
    validation::non_empty("q", &query.q)?;

    Ok(Json(state.store.search_cryptocurrencies(query.q.trim()).await?))
}

pub async fn get_cryptocurrency(
    State(state): State<AppState>,
    Path(crypto_id): Path<String>,
) -> ApiResult<Json<Cryptocurrency>> {
    let crypto = state
        .store
        .get_cryptocurrency(&crypto_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Cryptocurrency {crypto_id}")))?;

    Ok(Json(crypto))
}

/// Price history, oldest first. Unknown ids yield an empty series.
pub async fn get_price_history(
    State(state): State<AppState>,
    Path(crypto_id): Path<String>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<PricePoint>>> {
    let Query(query) = query?;
    let hours = validation::history_hours(query.hours)?;

    Ok(Json(state.store.get_price_history(&crypto_id, hours).await?))
}
