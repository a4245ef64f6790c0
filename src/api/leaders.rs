//! Adult leader endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{
    CreateLeaderRequest, LeaderDetail, PageSpec, Paginated, PositionRequest, SortSpec,
    UpdateLeaderRequest,
};
use crate::AppState;

const SORT_COLUMNS: &[&str] = &[
    "ypt_expiration_date",
    "ypt_completion_date",
    "registration_expiration_date",
    "created_at",
];

const YPT_FILTERS: &[&str] = &["expired", "expiring_soon", "current", "unknown"];

#[derive(Debug, Deserialize)]
pub struct LeaderListParams {
    pub ypt_status: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ExpiringSoonParams {
    pub days: Option<u32>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub async fn list_leaders(
    State(state): State<AppState>,
    Query(params): Query<LeaderListParams>,
) -> super::ApiResult<Paginated<LeaderDetail>> {
    if let Some(filter) = params.ypt_status.as_deref() {
        if !YPT_FILTERS.contains(&filter) {
            return Err(AppError::validation(format!(
                "unknown ypt_status filter '{}'",
                filter
            )));
        }
    }
    let sort = SortSpec::resolve(
        params.sort.as_deref(),
        params.direction.as_deref(),
        SORT_COLUMNS,
        "created_at",
    )?;
    let page = PageSpec::new(params.page, params.per_page);
    let today = Utc::now().date_naive();

    let result = state
        .repo
        .list_leaders(
            params.ypt_status.as_deref(),
            params.search.as_deref(),
            &sort,
            &page,
            today,
        )
        .await?;
    Ok(Json(result))
}

pub async fn get_leader(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> super::ApiResult<LeaderDetail> {
    let today = Utc::now().date_naive();
    state
        .repo
        .get_leader_detail(id, today)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Adult leader", id))
}

pub async fn create_leader(
    State(state): State<AppState>,
    Json(request): Json<CreateLeaderRequest>,
) -> Result<(StatusCode, Json<LeaderDetail>), AppError> {
    let today = Utc::now().date_naive();
    let detail = state.repo.create_leader(&request, today).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn update_leader(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateLeaderRequest>,
) -> super::ApiResult<LeaderDetail> {
    let today = Utc::now().date_naive();
    Ok(Json(state.repo.update_leader(id, &request, today).await?))
}

pub async fn delete_leader(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.repo.delete_leader(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Leaders whose YPT lapses within `days` (default 30, capped at 3650
/// to keep date arithmetic in range).
pub async fn expiring_leaders(
    State(state): State<AppState>,
    Query(params): Query<ExpiringSoonParams>,
) -> super::ApiResult<Paginated<LeaderDetail>> {
    let days = params.days.unwrap_or(30).clamp(1, 3650);
    let page = PageSpec::new(params.page, params.per_page);
    let today = Utc::now().date_naive();
    let result = state.repo.expiring_leaders(days, &page, today).await?;
    Ok(Json(result))
}

/// Idempotent append: adding a position a leader already holds is a no-op.
pub async fn add_position(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<PositionRequest>,
) -> super::ApiResult<LeaderDetail> {
    if request.position.trim().is_empty() {
        return Err(AppError::validation("position must not be empty"));
    }
    let today = Utc::now().date_naive();
    Ok(Json(state.repo.add_position(id, &request.position, today).await?))
}

pub async fn remove_position(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<PositionRequest>,
) -> super::ApiResult<LeaderDetail> {
    let today = Utc::now().date_naive();
    Ok(Json(
        state.repo.remove_position(id, &request.position, today).await?,
    ))
}
