use crate::ids::{CourseId, EnrollmentId, PublicId, SchoolId};
use jifunze_core::PaginationParams;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A student's enrollment in a course. Student and course always share a
/// school.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub user_id: PublicId,
    pub course_id: CourseId,
    pub school_id: SchoolId,
    pub date_enrolled: chrono::DateTime<chrono::Utc>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateEnrollmentDto {
    pub user_id: PublicId,
    pub course_id: CourseId,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnrollmentFilterParams {
    pub course_id: Option<CourseId>,
    pub user_id: Option<PublicId>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}
