use anyhow::anyhow;
use axum::extract::{Path, Query, State, rejection::QueryRejection};
use jifunze_core::{ApiResponse, AppError, Paginated};
use jifunze_models::{
    AssignUserDto, CreateSchoolDto, School, SchoolFilterParams, SchoolId, UpdateSchoolDto, User,
    UserFilterParams,
};

use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service::SchoolService;

pub async fn create_school(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateSchoolDto>,
) -> Result<ApiResponse<School>, AppError> {
    let school = SchoolService::create_school(&state.db, auth_user.claims(), dto).await?;
    Ok(ApiResponse::created("School created", school))
}

pub async fn get_schools(
    State(state): State<AppState>,
    auth_user: AuthUser,
    filters: Result<Query<SchoolFilterParams>, QueryRejection>,
) -> Result<ApiResponse<Paginated<School>>, AppError> {
    let Query(filters) =
        filters.map_err(|e| AppError::bad_request(anyhow!("Invalid query parameters: {}", e)))?;

    let schools = SchoolService::list_schools(&state.db, auth_user.claims(), filters).await?;
    Ok(ApiResponse::ok("Schools retrieved", schools))
}

pub async fn get_school(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<SchoolId>,
) -> Result<ApiResponse<School>, AppError> {
    let school = SchoolService::get_school(&state.db, auth_user.claims(), id).await?;
    Ok(ApiResponse::ok("School retrieved", school))
}

pub async fn update_school(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<SchoolId>,
    ValidatedJson(dto): ValidatedJson<UpdateSchoolDto>,
) -> Result<ApiResponse<School>, AppError> {
    let school = SchoolService::update_school(&state.db, auth_user.claims(), id, dto).await?;
    Ok(ApiResponse::ok("School updated", school))
}

pub async fn delete_school(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<SchoolId>,
) -> Result<ApiResponse<()>, AppError> {
    SchoolService::delete_school(&state.db, auth_user.claims(), id).await?;
    Ok(ApiResponse::message("School deleted"))
}

pub async fn get_school_users(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<SchoolId>,
    filters: Result<Query<UserFilterParams>, QueryRejection>,
) -> Result<ApiResponse<Paginated<User>>, AppError> {
    let Query(filters) =
        filters.map_err(|e| AppError::bad_request(anyhow!("Invalid query parameters: {}", e)))?;

    let users = SchoolService::list_school_users(&state.db, auth_user.claims(), id, filters).await?;
    Ok(ApiResponse::ok("School users retrieved", users))
}

pub async fn assign_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<SchoolId>,
    ValidatedJson(dto): ValidatedJson<AssignUserDto>,
) -> Result<ApiResponse<User>, AppError> {
    let user = SchoolService::assign_user(&state.db, auth_user.claims(), id, dto).await?;
    Ok(ApiResponse::ok("User assigned to school", user))
}
