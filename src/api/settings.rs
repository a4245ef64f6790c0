//! Keyed application settings.

use axum::extract::{Path, State};
use axum::Json;

use crate::errors::AppError;
use crate::models::{SetSettingRequest, Setting};
use crate::AppState;

pub async fn get_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> super::ApiResult<Setting> {
    state
        .repo
        .get_setting(&key)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Setting '{}' not found", key)))
}

pub async fn put_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(request): Json<SetSettingRequest>,
) -> super::ApiResult<Setting> {
    if key.trim().is_empty() {
        return Err(AppError::validation("setting key must not be empty"));
    }
    Ok(Json(
        state.repo.set_setting(&key, request.value.as_deref()).await?,
    ))
}
