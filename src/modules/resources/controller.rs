use anyhow::anyhow;
use axum::extract::{Path, Query, State, rejection::QueryRejection};
use jifunze_core::{ApiResponse, AppError, Paginated};
use jifunze_models::{CreateResourceDto, Resource, ResourceFilterParams, ResourceId, UpdateResourceDto};

use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service::ResourceService;

pub async fn create_resource(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateResourceDto>,
) -> Result<ApiResponse<Resource>, AppError> {
    let resource = ResourceService::create_resource(&state.db, auth_user.claims(), dto).await?;
    Ok(ApiResponse::created("Resource added", resource))
}

/// `course_id` is required.
pub async fn get_resources(
    State(state): State<AppState>,
    auth_user: AuthUser,
    filters: Result<Query<ResourceFilterParams>, QueryRejection>,
) -> Result<ApiResponse<Paginated<Resource>>, AppError> {
    let Query(filters) =
        filters.map_err(|e| AppError::bad_request(anyhow!("Invalid query parameters: {}", e)))?;

    let resources = ResourceService::list_resources(&state.db, auth_user.claims(), filters).await?;
    Ok(ApiResponse::ok("Resources retrieved", resources))
}

pub async fn get_resource(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<ResourceId>,
) -> Result<ApiResponse<Resource>, AppError> {
    let resource = ResourceService::get_resource(&state.db, auth_user.claims(), id).await?;
    Ok(ApiResponse::ok("Resource retrieved", resource))
}

pub async fn update_resource(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<ResourceId>,
    ValidatedJson(dto): ValidatedJson<UpdateResourceDto>,
) -> Result<ApiResponse<Resource>, AppError> {
    let resource = ResourceService::update_resource(&state.db, auth_user.claims(), id, dto).await?;
    Ok(ApiResponse::ok("Resource updated", resource))
}

pub async fn delete_resource(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<ResourceId>,
) -> Result<ApiResponse<()>, AppError> {
    ResourceService::delete_resource(&state.db, auth_user.claims(), id).await?;
    Ok(ApiResponse::message("Resource deleted"))
}
