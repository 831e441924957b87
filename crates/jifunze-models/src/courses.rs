use crate::ids::{CourseId, PublicId, SchoolId};
use jifunze_core::PaginationParams;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A course taught by one educator within one school.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub description: Option<String>,
    pub school_id: SchoolId,
    pub educator_id: PublicId,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for creating a course.
///
/// Educators create courses in their own school and teach them; managers
/// must name both the school and the educator.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCourseDto {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: Option<String>,
    pub school_id: Option<SchoolId>,
    pub educator_id: Option<PublicId>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCourseDto {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub educator_id: Option<PublicId>,
}

impl UpdateCourseDto {
    pub fn changed_fields(&self) -> Vec<&'static str> {
        [
            ("title", self.title.is_some()),
            ("description", self.description.is_some()),
            ("educator_id", self.educator_id.is_some()),
        ]
        .into_iter()
        .filter_map(|(field, present)| present.then_some(field))
        .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseFilterParams {
    pub school_id: Option<SchoolId>,
    pub educator_id: Option<PublicId>,
    pub title: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}
