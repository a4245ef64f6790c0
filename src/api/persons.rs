//! Person endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{
    CreatePersonRequest, MergeRequest, PageSpec, Paginated, PersonDetail, PersonType, SortSpec,
    UpdatePersonRequest,
};
use crate::AppState;

const SORT_COLUMNS: &[&str] = &[
    "first_name",
    "last_name",
    "email",
    "person_type",
    "created_at",
    "updated_at",
];

#[derive(Debug, Deserialize)]
pub struct PersonListParams {
    pub family_id: Option<i64>,
    pub person_type: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct OrphanedSearchParams {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub async fn list_persons(
    State(state): State<AppState>,
    Query(params): Query<PersonListParams>,
) -> super::ApiResult<Paginated<PersonDetail>> {
    let person_type = params
        .person_type
        .as_deref()
        .map(|s| {
            PersonType::from_str(s)
                .ok_or_else(|| AppError::validation(format!("unknown person_type '{}'", s)))
        })
        .transpose()?;
    let sort = SortSpec::resolve(
        params.sort.as_deref(),
        params.direction.as_deref(),
        SORT_COLUMNS,
        "last_name, first_name",
    )?;
    let page = PageSpec::new(params.page, params.per_page);
    let today = Utc::now().date_naive();

    let result = state
        .repo
        .list_persons(
            params.family_id,
            person_type,
            params.search.as_deref(),
            &sort,
            &page,
            today,
        )
        .await?;
    Ok(Json(result))
}

pub async fn get_person(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> super::ApiResult<PersonDetail> {
    let today = Utc::now().date_naive();
    state
        .repo
        .get_person_detail(id, today)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Person", id))
}

pub async fn create_person(
    State(state): State<AppState>,
    Json(request): Json<CreatePersonRequest>,
) -> Result<(StatusCode, Json<PersonDetail>), AppError> {
    if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
        return Err(AppError::validation(
            "first_name and last_name must not be empty",
        ));
    }
    let today = Utc::now().date_naive();
    let detail = state.repo.create_person(&request, today).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn update_person(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdatePersonRequest>,
) -> super::ApiResult<PersonDetail> {
    for name in [&request.first_name, &request.last_name].into_iter().flatten() {
        if name.trim().is_empty() {
            return Err(AppError::validation("name fields must not be empty"));
        }
    }
    let today = Utc::now().date_naive();
    Ok(Json(state.repo.update_person(id, &request, today).await?))
}

pub async fn delete_person(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.repo.delete_person(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Search persons that have no family, for the duplicate-resolution UI.
pub async fn search_orphaned(
    State(state): State<AppState>,
    Query(params): Query<OrphanedSearchParams>,
) -> super::ApiResult<Paginated<PersonDetail>> {
    let page = PageSpec::new(params.page, params.per_page);
    let today = Utc::now().date_naive();
    let result = state
        .repo
        .search_orphaned(params.search.as_deref(), &page, today)
        .await?;
    Ok(Json(result))
}

pub async fn merge_persons(
    State(state): State<AppState>,
    Json(request): Json<MergeRequest>,
) -> super::ApiResult<PersonDetail> {
    let today = Utc::now().date_naive();
    let detail = state
        .repo
        .merge_persons(request.primary_id, request.merge_id, today)
        .await?;
    Ok(Json(detail))
}
