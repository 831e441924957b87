use anyhow::anyhow;
use axum::extract::{Path, Query, State, rejection::QueryRejection};
use jifunze_core::{ApiResponse, AppError, Paginated};
use jifunze_models::{ChangePasswordDto, PublicId, UpdateUserDto, User, UserFilterParams};

use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service::UserService;

pub async fn get_me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<ApiResponse<User>, AppError> {
    let user = UserService::get_me(&state.db, auth_user.claims()).await?;
    Ok(ApiResponse::ok("Profile retrieved", user))
}

pub async fn change_password(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<ChangePasswordDto>,
) -> Result<ApiResponse<()>, AppError> {
    UserService::change_password(&state.db, auth_user.claims(), dto).await?;
    Ok(ApiResponse::message("Password changed successfully"))
}

pub async fn get_users(
    State(state): State<AppState>,
    auth_user: AuthUser,
    filters: Result<Query<UserFilterParams>, QueryRejection>,
) -> Result<ApiResponse<Paginated<User>>, AppError> {
    let Query(filters) =
        filters.map_err(|e| AppError::bad_request(anyhow!("Invalid query parameters: {}", e)))?;

    let users = UserService::list_users(&state.db, auth_user.claims(), filters).await?;
    Ok(ApiResponse::ok("Users retrieved", users))
}

pub async fn get_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(public_id): Path<PublicId>,
) -> Result<ApiResponse<User>, AppError> {
    let user = UserService::get_user(&state.db, auth_user.claims(), public_id).await?;
    Ok(ApiResponse::ok("User retrieved", user))
}

pub async fn update_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(public_id): Path<PublicId>,
    ValidatedJson(dto): ValidatedJson<UpdateUserDto>,
) -> Result<ApiResponse<User>, AppError> {
    let user = UserService::update_user(&state.db, auth_user.claims(), public_id, dto).await?;
    Ok(ApiResponse::ok("User updated", user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(public_id): Path<PublicId>,
) -> Result<ApiResponse<()>, AppError> {
    UserService::delete_user(&state.db, auth_user.claims(), public_id).await?;
    Ok(ApiResponse::message("User deleted"))
}
