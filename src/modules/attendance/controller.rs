use anyhow::anyhow;
use axum::extract::{Path, Query, State, rejection::QueryRejection};
use jifunze_core::{ApiResponse, AppError, Paginated};
use jifunze_models::{
    Attendance, AttendanceFilterParams, AttendanceId, CreateAttendanceDto, UpdateAttendanceDto,
};

use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service::AttendanceService;

pub async fn create_attendance(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateAttendanceDto>,
) -> Result<ApiResponse<Attendance>, AppError> {
    let record = AttendanceService::create_attendance(&state.db, auth_user.claims(), dto).await?;
    Ok(ApiResponse::created("Attendance recorded", record))
}

pub async fn get_attendance_records(
    State(state): State<AppState>,
    auth_user: AuthUser,
    filters: Result<Query<AttendanceFilterParams>, QueryRejection>,
) -> Result<ApiResponse<Paginated<Attendance>>, AppError> {
    let Query(filters) =
        filters.map_err(|e| AppError::bad_request(anyhow!("Invalid query parameters: {}", e)))?;

    let records = AttendanceService::list_attendance(&state.db, auth_user.claims(), filters).await?;
    Ok(ApiResponse::ok("Attendance retrieved", records))
}

pub async fn get_attendance(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<AttendanceId>,
) -> Result<ApiResponse<Attendance>, AppError> {
    let record = AttendanceService::get_attendance(&state.db, auth_user.claims(), id).await?;
    Ok(ApiResponse::ok("Attendance record retrieved", record))
}

pub async fn update_attendance(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<AttendanceId>,
    ValidatedJson(dto): ValidatedJson<UpdateAttendanceDto>,
) -> Result<ApiResponse<Attendance>, AppError> {
    let record =
        AttendanceService::update_attendance(&state.db, auth_user.claims(), id, dto).await?;
    Ok(ApiResponse::ok("Attendance updated", record))
}

pub async fn delete_attendance(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<AttendanceId>,
) -> Result<ApiResponse<()>, AppError> {
    AttendanceService::delete_attendance(&state.db, auth_user.claims(), id).await?;
    Ok(ApiResponse::message("Attendance record deleted"))
}
