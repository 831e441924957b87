use anyhow::anyhow;
use jifunze_auth::{Action, Claims, check_fields};
use jifunze_core::{AppError, Paginated};
use jifunze_models::relations::Entity;
use jifunze_models::{
    CourseId, CreateResourceDto, PublicId, Resource, ResourceFilterParams, ResourceId,
    UpdateResourceDto,
};
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::{debug, info, instrument};

use crate::cascade::delete_cascade;
use crate::utils::auth_helpers::{CourseScope, authorize, caller_id, load_course_scope};

const RESOURCE_SELECT: &str = "SELECT r.id, r.course_id, u.public_id AS uploaded_by, r.title,
        r.url, r.type, r.created_at, r.updated_at
     FROM resources r
     JOIN users u ON u.id = r.uploaded_by";

#[derive(Debug, FromRow)]
struct ResourceScope {
    course_id: CourseId,
    uploader: PublicId,
}

pub struct ResourceService;

impl ResourceService {
    async fn fetch(conn: &mut PgConnection, id: ResourceId) -> Result<Resource, AppError> {
        sqlx::query_as::<_, Resource>(&format!("{RESOURCE_SELECT} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Resource not found")))
    }

    /// Loads the resource's uploader together with its course.
    async fn load_scope(
        conn: &mut PgConnection,
        claims: &Claims,
        id: ResourceId,
        lock: bool,
    ) -> Result<(ResourceScope, CourseScope), AppError> {
        let sql = format!(
            "SELECT r.course_id, u.public_id AS uploader
             FROM resources r
             JOIN users u ON u.id = r.uploaded_by
             WHERE r.id = $1 {}",
            if lock { "FOR UPDATE OF r" } else { "" }
        );

        let scope = sqlx::query_as::<_, ResourceScope>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Resource not found")))?;

        let course = load_course_scope(conn, scope.course_id, Some(claims.sub)).await?;
        Ok((scope, course))
    }

    #[instrument(skip(db, claims, dto), fields(course.id = %dto.course_id, db.operation = "INSERT", db.table = "resources"))]
    pub async fn create_resource(
        db: &PgPool,
        claims: &Claims,
        dto: CreateResourceDto,
    ) -> Result<Resource, AppError> {
        let mut tx = db.begin().await?;

        let course = load_course_scope(&mut tx, dto.course_id, Some(claims.sub)).await?;
        authorize(Some(claims), Action::ResourceCreate, &course.target())?;

        let uploader = caller_id(&mut tx, claims).await?;

        let id: ResourceId = sqlx::query_scalar(
            "INSERT INTO resources (course_id, uploaded_by, title, url, type)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(course.id)
        .bind(uploader)
        .bind(&dto.title)
        .bind(&dto.url)
        .bind(&dto.resource_type)
        .fetch_one(&mut *tx)
        .await?;

        let resource = Self::fetch(&mut tx, id).await?;
        tx.commit().await?;

        info!(resource.id = %id, resource.kind = %resource.resource_type, "Resource added");
        Ok(resource)
    }

    #[instrument(skip(db, claims, filters), fields(course.id = %filters.course_id, db.operation = "SELECT", db.table = "resources"))]
    pub async fn list_resources(
        db: &PgPool,
        claims: &Claims,
        filters: ResourceFilterParams,
    ) -> Result<Paginated<Resource>, AppError> {
        let mut conn = db.acquire().await?;

        let course = load_course_scope(&mut conn, filters.course_id, Some(claims.sub)).await?;
        authorize(Some(claims), Action::ResourceList, &course.target())?;

        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();
        debug!(limit, offset, "Fetching resources");

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM resources WHERE course_id = $1")
            .bind(course.id)
            .fetch_one(&mut *conn)
            .await?;

        let resources = sqlx::query_as::<_, Resource>(&format!(
            "{RESOURCE_SELECT} WHERE r.course_id = $1
             ORDER BY r.created_at DESC, r.id DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(course.id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await?;

        Ok(Paginated::new(resources, total, &filters.pagination))
    }

    #[instrument(skip(db, claims), fields(resource.id = %id, db.operation = "SELECT", db.table = "resources"))]
    pub async fn get_resource(
        db: &PgPool,
        claims: &Claims,
        id: ResourceId,
    ) -> Result<Resource, AppError> {
        let mut conn = db.acquire().await?;

        let (_, course) = Self::load_scope(&mut conn, claims, id, false).await?;
        authorize(Some(claims), Action::ResourceRead, &course.target())?;

        Self::fetch(&mut conn, id).await
    }

    #[instrument(skip(db, claims, dto), fields(resource.id = %id, db.operation = "UPDATE", db.table = "resources"))]
    pub async fn update_resource(
        db: &PgPool,
        claims: &Claims,
        id: ResourceId,
        dto: UpdateResourceDto,
    ) -> Result<Resource, AppError> {
        let fields = dto.changed_fields();
        if fields.is_empty() {
            return Err(AppError::bad_request(anyhow!("No fields to update")));
        }

        let mut tx = db.begin().await?;

        let (scope, course) = Self::load_scope(&mut tx, claims, id, true).await?;
        authorize(
            Some(claims),
            Action::ResourceUpdate,
            &course.target().with_owner(scope.uploader),
        )?;
        check_fields(claims.role, Entity::Resource, &fields)?;

        sqlx::query(
            "UPDATE resources
             SET title = COALESCE($1, title),
                 url = COALESCE($2, url),
                 type = COALESCE($3, type),
                 updated_at = NOW()
             WHERE id = $4",
        )
        .bind(dto.title.as_deref())
        .bind(dto.url.as_deref())
        .bind(dto.resource_type.as_deref())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let updated = Self::fetch(&mut tx, id).await?;
        tx.commit().await?;

        info!(resource.id = %id, fields = ?fields, "Resource updated");
        Ok(updated)
    }

    #[instrument(skip(db, claims), fields(resource.id = %id, db.operation = "DELETE", db.table = "resources"))]
    pub async fn delete_resource(
        db: &PgPool,
        claims: &Claims,
        id: ResourceId,
    ) -> Result<(), AppError> {
        let mut tx = db.begin().await?;

        let (scope, course) = Self::load_scope(&mut tx, claims, id, true).await?;
        authorize(
            Some(claims),
            Action::ResourceDelete,
            &course.target().with_owner(scope.uploader),
        )?;

        delete_cascade(&mut tx, Entity::Resource, &[id.into_inner()]).await?;
        tx.commit().await?;

        info!(resource.id = %id, "Resource deleted");
        Ok(())
    }
}
