//! Price alert endpoints.
//!
//! Alerts are keyed by user for listing and by alert id for updates and
//! deletes. Creation checks the watched cryptocurrency exists.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use crate::domain::models::{NewPriceAlert, PriceAlert, PriceAlertPatch, PriceAlertWithCrypto};

use super::error::{ApiError, ApiResult};
use super::validation;
use super::AppState;

pub async fn get_price_alerts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<PriceAlertWithCrypto>>> {
    Ok(Json(state.store.get_price_alerts(&user_id).await?))
}

pub async fn create_price_alert(
    State(state): State<AppState>,
    payload: Result<Json<NewPriceAlert>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PriceAlert>)> {
    let Json(new_alert) = payload?;
    validation::non_empty("userId", &new_alert.user_id)?;
    validation::non_empty("cryptoId", &new_alert.crypto_id)?;
    validation::positive("targetValue", new_alert.target_value)?;

    if state.store.get_cryptocurrency(&new_alert.crypto_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Cryptocurrency {}", new_alert.crypto_id)));
    }

    let alert = state.store.create_price_alert(new_alert).await?;
    info!(
        alert_id = %alert.id,
        user_id = %alert.user_id,
        crypto_id = %alert.crypto_id,
        alert_type = %alert.alert_type,
        target = %alert.target_value,
        "Price alert created"
    );

    Ok((StatusCode::CREATED, Json(alert)))
}

/// Partial update. Clients use it to pause, re-arm or retarget alerts.
pub async fn update_price_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<String>,
    payload: Result<Json<PriceAlertPatch>, JsonRejection>,
) -> ApiResult<Json<PriceAlert>> {
    let Json(patch) = payload?;
    if patch.is_empty() {
        return Err(ApiError::Validation(
            "patch must change at least one field".to_string(),
        ));
    }
    if let Some(target) = patch.target_value {
        validation::positive("targetValue", target)?;
    }

    let alert = state
        .store
        .update_price_alert(&alert_id, patch)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Price alert {alert_id}")))?;

    Ok(Json(alert))
}

pub async fn delete_price_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.delete_price_alert(&alert_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
