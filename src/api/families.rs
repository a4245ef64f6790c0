//! Family endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{
    CreateFamilyRequest, FamilyDetail, MergeRequest, PageSpec, Paginated, SortSpec,
    UpdateFamilyRequest,
};
use crate::AppState;

const SORT_COLUMNS: &[&str] = &["name", "city", "state", "zip", "created_at", "updated_at"];

#[derive(Debug, Deserialize)]
pub struct FamilyListParams {
    pub search: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub async fn list_families(
    State(state): State<AppState>,
    Query(params): Query<FamilyListParams>,
) -> super::ApiResult<Paginated<FamilyDetail>> {
    let sort = SortSpec::resolve(
        params.sort.as_deref(),
        params.direction.as_deref(),
        SORT_COLUMNS,
        "name",
    )?;
    let page = PageSpec::new(params.page, params.per_page);
    let result = state
        .repo
        .list_families(params.search.as_deref(), &sort, &page)
        .await?;
    Ok(Json(result))
}

pub async fn get_family(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> super::ApiResult<FamilyDetail> {
    state
        .repo
        .get_family_detail(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Family", id))
}

pub async fn create_family(
    State(state): State<AppState>,
    Json(request): Json<CreateFamilyRequest>,
) -> Result<(StatusCode, Json<FamilyDetail>), AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::validation("name must not be empty"));
    }
    let detail = state.repo.create_family(&request).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn update_family(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateFamilyRequest>,
) -> super::ApiResult<FamilyDetail> {
    if let Some(name) = &request.name {
        if name.trim().is_empty() {
            return Err(AppError::validation("name must not be empty"));
        }
    }
    Ok(Json(state.repo.update_family(id, &request).await?))
}

pub async fn delete_family(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.repo.delete_family(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn merge_families(
    State(state): State<AppState>,
    Json(request): Json<MergeRequest>,
) -> super::ApiResult<FamilyDetail> {
    let detail = state
        .repo
        .merge_families(request.primary_id, request.merge_id)
        .await?;
    Ok(Json(detail))
}
