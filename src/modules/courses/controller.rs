use anyhow::anyhow;
use axum::extract::{Path, Query, State, rejection::QueryRejection};
use jifunze_core::{ApiResponse, AppError, Paginated};
use jifunze_models::{Course, CourseFilterParams, CourseId, CreateCourseDto, UpdateCourseDto};

use crate::middleware::auth::{AuthUser, OptionalAuthUser};
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service::CourseService;

pub async fn get_courses(
    State(state): State<AppState>,
    OptionalAuthUser(claims): OptionalAuthUser,
    filters: Result<Query<CourseFilterParams>, QueryRejection>,
) -> Result<ApiResponse<Paginated<Course>>, AppError> {
    let Query(filters) =
        filters.map_err(|e| AppError::bad_request(anyhow!("Invalid query parameters: {}", e)))?;

    let courses = CourseService::list_courses(&state.db, claims.as_ref(), filters).await?;
    Ok(ApiResponse::ok("Courses retrieved", courses))
}

pub async fn get_course(
    State(state): State<AppState>,
    OptionalAuthUser(claims): OptionalAuthUser,
    Path(id): Path<CourseId>,
) -> Result<ApiResponse<Course>, AppError> {
    let course = CourseService::get_course(&state.db, claims.as_ref(), id).await?;
    Ok(ApiResponse::ok("Course retrieved", course))
}

pub async fn create_course(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateCourseDto>,
) -> Result<ApiResponse<Course>, AppError> {
    let course = CourseService::create_course(&state.db, auth_user.claims(), dto).await?;
    Ok(ApiResponse::created("Course created", course))
}

pub async fn update_course(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<CourseId>,
    ValidatedJson(dto): ValidatedJson<UpdateCourseDto>,
) -> Result<ApiResponse<Course>, AppError> {
    let course = CourseService::update_course(&state.db, auth_user.claims(), id, dto).await?;
    Ok(ApiResponse::ok("Course updated", course))
}

pub async fn delete_course(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<CourseId>,
) -> Result<ApiResponse<()>, AppError> {
    CourseService::delete_course(&state.db, auth_user.claims(), id).await?;
    Ok(ApiResponse::message("Course deleted"))
}
