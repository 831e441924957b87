use anyhow::anyhow;
use axum::extract::{Path, Query, State, rejection::QueryRejection};
use jifunze_core::{ApiResponse, AppError, Paginated};
use jifunze_models::{CreateMessageDto, Message, MessageFilterParams, MessageId, UpdateMessageDto};

use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service::MessageService;

pub async fn create_message(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateMessageDto>,
) -> Result<ApiResponse<Message>, AppError> {
    let message = MessageService::create_message(&state.db, auth_user.claims(), dto).await?;
    Ok(ApiResponse::created("Message posted", message))
}

/// `course_id` is required.
pub async fn get_messages(
    State(state): State<AppState>,
    auth_user: AuthUser,
    filters: Result<Query<MessageFilterParams>, QueryRejection>,
) -> Result<ApiResponse<Paginated<Message>>, AppError> {
    let Query(filters) =
        filters.map_err(|e| AppError::bad_request(anyhow!("Invalid query parameters: {}", e)))?;

    let messages = MessageService::list_messages(&state.db, auth_user.claims(), filters).await?;
    Ok(ApiResponse::ok("Messages retrieved", messages))
}

pub async fn get_message(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<MessageId>,
) -> Result<ApiResponse<Message>, AppError> {
    let message = MessageService::get_message(&state.db, auth_user.claims(), id).await?;
    Ok(ApiResponse::ok("Message retrieved", message))
}

pub async fn update_message(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<MessageId>,
    ValidatedJson(dto): ValidatedJson<UpdateMessageDto>,
) -> Result<ApiResponse<Message>, AppError> {
    let message = MessageService::update_message(&state.db, auth_user.claims(), id, dto).await?;
    Ok(ApiResponse::ok("Message updated", message))
}

pub async fn delete_message(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<MessageId>,
) -> Result<ApiResponse<()>, AppError> {
    MessageService::delete_message(&state.db, auth_user.claims(), id).await?;
    Ok(ApiResponse::message("Message deleted"))
}
