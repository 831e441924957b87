//! Attendance records: one per (student, course, date).

use crate::ids::{AttendanceId, CourseId, PublicId, SchoolId};
use crate::value_types::AttendanceStatus;
use chrono::NaiveDate;
use jifunze_core::PaginationParams;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Attendance {
    pub id: AttendanceId,
    pub user_id: PublicId,
    pub course_id: CourseId,
    pub school_id: SchoolId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub verified_by: Option<PublicId>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAttendanceDto {
    pub user_id: PublicId,
    pub course_id: CourseId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub verified_by: Option<PublicId>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateAttendanceDto {
    pub date: Option<NaiveDate>,
    pub status: Option<AttendanceStatus>,
    pub verified_by: Option<PublicId>,
}

impl UpdateAttendanceDto {
    pub fn changed_fields(&self) -> Vec<&'static str> {
        [
            ("date", self.date.is_some()),
            ("status", self.status.is_some()),
            ("verified_by", self.verified_by.is_some()),
        ]
        .into_iter()
        .filter_map(|(field, present)| present.then_some(field))
        .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendanceFilterParams {
    pub course_id: Option<CourseId>,
    pub user_id: Option<PublicId>,
    pub date: Option<NaiveDate>,
    pub status: Option<AttendanceStatus>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}
