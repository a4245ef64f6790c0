//! Dashboard and reporting endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{
    AuditLog, DashboardStatistics, DenCount, ExpiringRecords, FamilyMembersReport, PageSpec,
    Paginated, PersonDetail, RankCount, RecordSyncRequest, SyncLog, SyncStatus,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ActivityParams {
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ExpiringWindowParams {
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct OrphanedParams {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SyncHistoryParams {
    #[serde(rename = "type")]
    pub sync_type: Option<String>,
    pub limit: Option<u32>,
}

pub async fn statistics(
    State(state): State<AppState>,
) -> super::ApiResult<DashboardStatistics> {
    let today = Utc::now().date_naive();
    Ok(Json(state.repo.statistics(today).await?))
}

/// Latest audit entries, newest first. `limit` defaults to 20, capped
/// at 100.
pub async fn recent_activity(
    State(state): State<AppState>,
    Query(params): Query<ActivityParams>,
) -> super::ApiResult<Vec<AuditLog>> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    Ok(Json(state.repo.recent_activity(limit).await?))
}

/// Scouts and leaders lapsing within `days` (default 60, capped at
/// 3650 to keep date arithmetic in range).
pub async fn expiring_records(
    State(state): State<AppState>,
    Query(params): Query<ExpiringWindowParams>,
) -> super::ApiResult<ExpiringRecords> {
    let days = params.days.unwrap_or(60).clamp(1, 3650);
    let today = Utc::now().date_naive();
    Ok(Json(state.repo.expiring_records(days, today).await?))
}

pub async fn orphaned_persons(
    State(state): State<AppState>,
    Query(params): Query<OrphanedParams>,
) -> super::ApiResult<Paginated<PersonDetail>> {
    let page = PageSpec::new(params.page, params.per_page);
    let today = Utc::now().date_naive();
    let result = state
        .repo
        .search_orphaned(params.search.as_deref(), &page, today)
        .await?;
    Ok(Json(result))
}

pub async fn sync_status(State(state): State<AppState>) -> super::ApiResult<SyncStatus> {
    Ok(Json(state.repo.sync_status().await?))
}

pub async fn sync_history(
    State(state): State<AppState>,
    Query(params): Query<SyncHistoryParams>,
) -> super::ApiResult<Vec<SyncLog>> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    Ok(Json(
        state
            .repo
            .sync_history(params.sync_type.as_deref(), limit)
            .await?,
    ))
}

/// Append a sync run outcome; called by the external sync jobs when
/// they finish.
pub async fn record_sync(
    State(state): State<AppState>,
    Json(request): Json<RecordSyncRequest>,
) -> Result<(StatusCode, Json<SyncLog>), AppError> {
    if request.sync_type.trim().is_empty() || request.status.trim().is_empty() {
        return Err(AppError::validation(
            "sync_type and status must not be empty",
        ));
    }
    let log = state.repo.record_sync_log(&request).await?;
    Ok((StatusCode::CREATED, Json(log)))
}

pub async fn family_members(
    State(state): State<AppState>,
    Path(family_id): Path<i64>,
) -> super::ApiResult<FamilyMembersReport> {
    state
        .repo
        .family_members_report(family_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Family", family_id))
}

pub async fn den_membership(State(state): State<AppState>) -> super::ApiResult<Vec<DenCount>> {
    Ok(Json(state.repo.den_membership().await?))
}

pub async fn rank_distribution(
    State(state): State<AppState>,
) -> super::ApiResult<Vec<RankCount>> {
    Ok(Json(state.repo.rank_distribution().await?))
}
