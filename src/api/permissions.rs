//! WordPress user permission endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{
    CreatePermissionRequest, PageSpec, Paginated, PermissionDetail, Role, SortSpec,
    UpdatePermissionRequest,
};
use crate::AppState;

const SORT_COLUMNS: &[&str] = &["role", "granted_at", "wordpress_user_id", "created_at"];

#[derive(Debug, Deserialize)]
pub struct PermissionListParams {
    pub role: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

fn parse_role(s: &str) -> Result<Role, AppError> {
    Role::from_str(s).ok_or_else(|| AppError::validation(format!("unknown role '{}'", s)))
}

pub async fn list_permissions(
    State(state): State<AppState>,
    Query(params): Query<PermissionListParams>,
) -> super::ApiResult<Paginated<PermissionDetail>> {
    let role = params.role.as_deref().map(parse_role).transpose()?;
    let sort = SortSpec::resolve(
        params.sort.as_deref(),
        params.direction.as_deref(),
        SORT_COLUMNS,
        "created_at",
    )?;
    let page = PageSpec::new(params.page, params.per_page);

    let result = state
        .repo
        .list_permissions(role, params.search.as_deref(), &sort, &page)
        .await?;
    Ok(Json(result))
}

pub async fn get_permission(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> super::ApiResult<PermissionDetail> {
    state
        .repo
        .get_permission_detail(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Permission", id))
}

pub async fn create_permission(
    State(state): State<AppState>,
    Json(request): Json<CreatePermissionRequest>,
) -> Result<(StatusCode, Json<PermissionDetail>), AppError> {
    let detail = state.repo.create_permission(&request).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn update_permission(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdatePermissionRequest>,
) -> super::ApiResult<PermissionDetail> {
    Ok(Json(state.repo.update_permission(id, &request).await?))
}

pub async fn delete_permission(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.repo.delete_permission(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn permissions_by_role(
    State(state): State<AppState>,
    Path(role): Path<String>,
    Query(params): Query<PageParams>,
) -> super::ApiResult<Paginated<PermissionDetail>> {
    let role = parse_role(&role)?;
    let page = PageSpec::new(params.page, params.per_page);
    Ok(Json(state.repo.permissions_by_role(role, &page).await?))
}

pub async fn permission_by_wordpress_user(
    State(state): State<AppState>,
    Path(wordpress_user_id): Path<i64>,
) -> super::ApiResult<PermissionDetail> {
    state
        .repo
        .permission_by_wordpress_user(wordpress_user_id)
        .await?
        .map(Json)
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No permission for WordPress user {}",
                wordpress_user_id
            ))
        })
}

pub async fn admin_permissions(
    State(state): State<AppState>,
) -> super::ApiResult<Vec<PermissionDetail>> {
    Ok(Json(state.repo.admin_permissions().await?))
}
