//! Scout endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{
    CreateScoutRequest, PageSpec, Paginated, ScoutDetail, SortSpec, UpdateScoutRequest,
};
use crate::AppState;

const SORT_COLUMNS: &[&str] = &[
    "den",
    "rank",
    "grade",
    "registration_expiration_date",
    "registration_status",
    "created_at",
];

const STATUS_FILTERS: &[&str] = &["active", "expiring_soon", "expired"];

#[derive(Debug, Deserialize)]
pub struct ScoutListParams {
    pub den: Option<String>,
    pub rank: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ExpiringParams {
    pub days: Option<u32>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub async fn list_scouts(
    State(state): State<AppState>,
    Query(params): Query<ScoutListParams>,
) -> super::ApiResult<Paginated<ScoutDetail>> {
    if let Some(status) = params.status.as_deref() {
        if !STATUS_FILTERS.contains(&status) {
            return Err(AppError::validation(format!(
                "unknown status filter '{}'",
                status
            )));
        }
    }
    let sort = SortSpec::resolve(
        params.sort.as_deref(),
        params.direction.as_deref(),
        SORT_COLUMNS,
        "den, rank",
    )?;
    let page = PageSpec::new(params.page, params.per_page);
    let today = Utc::now().date_naive();

    let result = state
        .repo
        .list_scouts(
            params.den.as_deref(),
            params.rank.as_deref(),
            params.status.as_deref(),
            params.search.as_deref(),
            &sort,
            &page,
            today,
        )
        .await?;
    Ok(Json(result))
}

pub async fn get_scout(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> super::ApiResult<ScoutDetail> {
    let today = Utc::now().date_naive();
    state
        .repo
        .get_scout_detail(id, today)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Scout", id))
}

pub async fn create_scout(
    State(state): State<AppState>,
    Json(request): Json<CreateScoutRequest>,
) -> Result<(StatusCode, Json<ScoutDetail>), AppError> {
    let today = Utc::now().date_naive();
    let detail = state.repo.create_scout(&request, today).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn update_scout(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateScoutRequest>,
) -> super::ApiResult<ScoutDetail> {
    let today = Utc::now().date_naive();
    Ok(Json(state.repo.update_scout(id, &request, today).await?))
}

pub async fn delete_scout(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.repo.delete_scout(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Active scouts whose registration lapses within `days` (default 60,
/// capped at 3650 to keep date arithmetic in range).
pub async fn expiring_scouts(
    State(state): State<AppState>,
    Query(params): Query<ExpiringParams>,
) -> super::ApiResult<Paginated<ScoutDetail>> {
    let days = params.days.unwrap_or(60).clamp(1, 3650);
    let page = PageSpec::new(params.page, params.per_page);
    let today = Utc::now().date_naive();
    let result = state.repo.expiring_scouts(days, &page, today).await?;
    Ok(Json(result))
}

/// Active scouts in one den.
pub async fn scouts_by_den(
    State(state): State<AppState>,
    Path(den): Path<String>,
) -> super::ApiResult<Vec<ScoutDetail>> {
    let today = Utc::now().date_naive();
    Ok(Json(state.repo.scouts_by_den(&den, today).await?))
}
