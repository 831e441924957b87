use anyhow::anyhow;
use axum::extract::{Path, Query, State, rejection::QueryRejection};
use jifunze_core::{ApiResponse, AppError, Paginated};
use jifunze_models::{CreateEnrollmentDto, Enrollment, EnrollmentFilterParams, EnrollmentId};

use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service::EnrollmentService;

pub async fn create_enrollment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateEnrollmentDto>,
) -> Result<ApiResponse<Enrollment>, AppError> {
    let enrollment =
        EnrollmentService::create_enrollment(&state.db, auth_user.claims(), dto).await?;
    Ok(ApiResponse::created("Student enrolled", enrollment))
}

pub async fn get_enrollments(
    State(state): State<AppState>,
    auth_user: AuthUser,
    filters: Result<Query<EnrollmentFilterParams>, QueryRejection>,
) -> Result<ApiResponse<Paginated<Enrollment>>, AppError> {
    let Query(filters) =
        filters.map_err(|e| AppError::bad_request(anyhow!("Invalid query parameters: {}", e)))?;

    let enrollments =
        EnrollmentService::list_enrollments(&state.db, auth_user.claims(), filters).await?;
    Ok(ApiResponse::ok("Enrollments retrieved", enrollments))
}

pub async fn get_enrollment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<EnrollmentId>,
) -> Result<ApiResponse<Enrollment>, AppError> {
    let enrollment = EnrollmentService::get_enrollment(&state.db, auth_user.claims(), id).await?;
    Ok(ApiResponse::ok("Enrollment retrieved", enrollment))
}

pub async fn delete_enrollment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<EnrollmentId>,
) -> Result<ApiResponse<()>, AppError> {
    EnrollmentService::delete_enrollment(&state.db, auth_user.claims(), id).await?;
    Ok(ApiResponse::message("Enrollment removed"))
}
