//! Whole-market summary endpoint.

use axum::extract::State;
use axum::Json;

use crate::domain::models::MarketSummary;

use super::error::{ApiError, ApiResult};
use super::AppState;

/// Latest cached summary. 404 until the first successful sync.
pub async fn get_market_summary(State(state): State<AppState>) -> ApiResult<Json<MarketSummary>> {
    let summary = state
        .store
        .get_market_summary()
        .await?
        .ok_or_else(|| ApiError::NotFound("Market summary".to_string()))?;

    Ok(Json(summary))
}
