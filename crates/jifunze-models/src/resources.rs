use crate::ids::{CourseId, PublicId, ResourceId};
use jifunze_core::PaginationParams;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Course material referenced by URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Resource {
    pub id: ResourceId,
    pub course_id: CourseId,
    pub uploaded_by: PublicId,
    pub title: String,
    pub url: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub resource_type: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateResourceDto {
    pub course_id: CourseId,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(url)]
    pub url: String,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50))]
    pub resource_type: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateResourceDto {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(url)]
    pub url: Option<String>,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50))]
    pub resource_type: Option<String>,
}

impl UpdateResourceDto {
    pub fn changed_fields(&self) -> Vec<&'static str> {
        [
            ("title", self.title.is_some()),
            ("url", self.url.is_some()),
            ("type", self.resource_type.is_some()),
        ]
        .into_iter()
        .filter_map(|(field, present)| present.then_some(field))
        .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceFilterParams {
    pub course_id: CourseId,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}
