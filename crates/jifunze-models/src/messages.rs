use crate::ids::{CourseId, MessageId, PublicId};
use jifunze_core::PaginationParams;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A course discussion message. Replies reference a parent in the same
/// course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Message {
    pub id: MessageId,
    pub course_id: CourseId,
    pub user_id: PublicId,
    pub parent_id: Option<MessageId>,
    pub content: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMessageDto {
    pub course_id: CourseId,
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
    pub parent_id: Option<MessageId>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateMessageDto {
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageFilterParams {
    pub course_id: CourseId,
    pub parent_id: Option<MessageId>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}
