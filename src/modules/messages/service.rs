use anyhow::anyhow;
use jifunze_auth::{Action, Claims, check_fields};
use jifunze_core::{AppError, Paginated};
use jifunze_models::relations::Entity;
use jifunze_models::{
    CourseId, CreateMessageDto, Message, MessageFilterParams, MessageId, PublicId,
    UpdateMessageDto,
};
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::{debug, info, instrument};

use crate::cascade::{CascadeSummary, delete_cascade};
use crate::guard::check_reply_parent;
use crate::utils::auth_helpers::{authorize, caller_id, load_course_scope};

const MESSAGE_SELECT: &str = "SELECT m.id, m.course_id, u.public_id AS user_id, m.parent_id,
        m.content, m.timestamp, m.created_at, m.updated_at
     FROM messages m
     JOIN users u ON u.id = m.user_id";

#[derive(Debug, FromRow)]
struct MessageScope {
    course_id: CourseId,
    author: PublicId,
}

pub struct MessageService;

impl MessageService {
    async fn fetch(conn: &mut PgConnection, id: MessageId) -> Result<Message, AppError> {
        sqlx::query_as::<_, Message>(&format!("{MESSAGE_SELECT} WHERE m.id = $1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Message not found")))
    }

    async fn load_scope(
        conn: &mut PgConnection,
        id: MessageId,
        lock: bool,
    ) -> Result<MessageScope, AppError> {
        let sql = format!(
            "SELECT m.course_id, u.public_id AS author
             FROM messages m
             JOIN users u ON u.id = m.user_id
             WHERE m.id = $1 {}",
            if lock { "FOR UPDATE OF m" } else { "" }
        );

        sqlx::query_as::<_, MessageScope>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Message not found")))
    }

    /// Posts to a course thread. Replies must point at a message of the
    /// same course.
    #[instrument(skip(db, claims, dto), fields(course.id = %dto.course_id, db.operation = "INSERT", db.table = "messages"))]
    pub async fn create_message(
        db: &PgPool,
        claims: &Claims,
        dto: CreateMessageDto,
    ) -> Result<Message, AppError> {
        let mut tx = db.begin().await?;

        let course = load_course_scope(&mut tx, dto.course_id, Some(claims.sub)).await?;
        authorize(Some(claims), Action::MessageCreate, &course.target())?;

        if let Some(parent_id) = dto.parent_id {
            check_reply_parent(&mut tx, parent_id, course.id).await?;
        }

        let author = caller_id(&mut tx, claims).await?;

        let id: MessageId = sqlx::query_scalar(
            "INSERT INTO messages (course_id, user_id, parent_id, content)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(course.id)
        .bind(author)
        .bind(dto.parent_id)
        .bind(&dto.content)
        .fetch_one(&mut *tx)
        .await?;

        let message = Self::fetch(&mut tx, id).await?;
        tx.commit().await?;

        info!(message.id = %id, reply = dto.parent_id.is_some(), "Message posted");
        Ok(message)
    }

    #[instrument(skip(db, claims, filters), fields(course.id = %filters.course_id, db.operation = "SELECT", db.table = "messages"))]
    pub async fn list_messages(
        db: &PgPool,
        claims: &Claims,
        filters: MessageFilterParams,
    ) -> Result<Paginated<Message>, AppError> {
        let mut conn = db.acquire().await?;

        let course = load_course_scope(&mut conn, filters.course_id, Some(claims.sub)).await?;
        authorize(Some(claims), Action::MessageList, &course.target())?;

        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();
        debug!(limit, offset, filter.parent_id = ?filters.parent_id, "Fetching messages");

        const WHERE: &str = "WHERE m.course_id = $1
               AND ($2::BIGINT IS NULL OR m.parent_id = $2)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM messages m {WHERE}"))
            .bind(course.id)
            .bind(filters.parent_id)
            .fetch_one(&mut *conn)
            .await?;

        let messages = sqlx::query_as::<_, Message>(&format!(
            "{MESSAGE_SELECT} {WHERE} ORDER BY m.timestamp ASC, m.id ASC LIMIT $3 OFFSET $4"
        ))
        .bind(course.id)
        .bind(filters.parent_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await?;

        Ok(Paginated::new(messages, total, &filters.pagination))
    }

    #[instrument(skip(db, claims), fields(message.id = %id, db.operation = "SELECT", db.table = "messages"))]
    pub async fn get_message(
        db: &PgPool,
        claims: &Claims,
        id: MessageId,
    ) -> Result<Message, AppError> {
        let mut conn = db.acquire().await?;

        let scope = Self::load_scope(&mut conn, id, false).await?;
        let course = load_course_scope(&mut conn, scope.course_id, Some(claims.sub)).await?;
        authorize(Some(claims), Action::MessageRead, &course.target())?;

        Self::fetch(&mut conn, id).await
    }

    /// Only the author (or the owning manager) may edit a message.
    #[instrument(skip(db, claims, dto), fields(message.id = %id, db.operation = "UPDATE", db.table = "messages"))]
    pub async fn update_message(
        db: &PgPool,
        claims: &Claims,
        id: MessageId,
        dto: UpdateMessageDto,
    ) -> Result<Message, AppError> {
        let mut tx = db.begin().await?;

        let scope = Self::load_scope(&mut tx, id, true).await?;
        let course = load_course_scope(&mut tx, scope.course_id, Some(claims.sub)).await?;
        authorize(
            Some(claims),
            Action::MessageUpdate,
            &course.target().with_owner(scope.author),
        )?;
        check_fields(claims.role, Entity::Message, &["content"])?;

        sqlx::query("UPDATE messages SET content = $1, updated_at = NOW() WHERE id = $2")
            .bind(&dto.content)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let updated = Self::fetch(&mut tx, id).await?;
        tx.commit().await?;

        info!(message.id = %id, "Message edited");
        Ok(updated)
    }

    /// Deleting a message removes its replies with it.
    #[instrument(skip(db, claims), fields(message.id = %id, db.operation = "DELETE", db.table = "messages"))]
    pub async fn delete_message(
        db: &PgPool,
        claims: &Claims,
        id: MessageId,
    ) -> Result<CascadeSummary, AppError> {
        let mut tx = db.begin().await?;

        let scope = Self::load_scope(&mut tx, id, true).await?;
        let course = load_course_scope(&mut tx, scope.course_id, Some(claims.sub)).await?;
        authorize(
            Some(claims),
            Action::MessageDelete,
            &course.target().with_owner(scope.author),
        )?;

        let summary = delete_cascade(&mut tx, Entity::Message, &[id.into_inner()]).await?;
        tx.commit().await?;

        info!(message.id = %id, removed = summary.deleted(Entity::Message), "Message deleted");
        Ok(summary)
    }
}
