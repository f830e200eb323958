//! User registration and lookup endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use crate::domain::models::{NewUser, User};

use super::error::{ApiError, ApiResult};
use super::validation;
use super::AppState;

pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let Json(new_user) = payload?;
    validation::non_empty("username", &new_user.username)?;
    validation::non_empty("password", &new_user.password)?;

    if state.store.get_user_by_username(&new_user.username).await?.is_some() {
        return Err(ApiError::Conflict(format!(
            "Username {} is already taken",
            new_user.username
        )));
    }

    let user = state.store.create_user(new_user).await?;
    info!(user_id = %user.id, username = %user.username, "User created");

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<User>> {
    let user = state
        .store
        .get_user(&user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {user_id}")))?;

    Ok(Json(user))
}
