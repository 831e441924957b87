use anyhow::anyhow;
use jifunze_auth::{Action, Claims, Target, check_fields};
use jifunze_core::{AppError, Paginated};
use jifunze_models::relations::Entity;
use jifunze_models::{
    Course, CourseFilterParams, CourseId, CreateCourseDto, Role, UpdateCourseDto, UserId,
};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, error, info, instrument};

use crate::cascade::{CascadeSummary, delete_cascade};
use crate::guard::{
    GuardError, check_course_title, check_educator, lock_member, map_unique_violation,
};
use crate::metrics;
use crate::utils::auth_helpers::{authorize, load_course_scope, load_school_scope, target_school};

const COURSE_SELECT: &str = "SELECT c.id, c.title, c.description, c.school_id,
        e.public_id AS educator_id, c.created_at, c.updated_at
     FROM courses c
     JOIN users e ON e.id = c.educator_id";

const TITLE_KEY: &str = "courses_school_title_key";

pub struct CourseService;

impl CourseService {
    async fn fetch(conn: &mut PgConnection, id: CourseId) -> Result<Course, AppError> {
        sqlx::query_as::<_, Course>(&format!("{COURSE_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Course not found")))
    }

    #[instrument(skip(db, claims, filters), fields(db.operation = "SELECT", db.table = "courses"))]
    pub async fn list_courses(
        db: &PgPool,
        claims: Option<&Claims>,
        filters: CourseFilterParams,
    ) -> Result<Paginated<Course>, AppError> {
        authorize(claims, Action::CourseList, &Target::none())?;

        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();

        debug!(
            limit,
            offset,
            filter.school_id = ?filters.school_id,
            filter.title = ?filters.title,
            "Fetching courses"
        );

        const WHERE: &str = "WHERE ($1::BIGINT IS NULL OR c.school_id = $1)
               AND ($2::UUID IS NULL OR e.public_id = $2)
               AND ($3::TEXT IS NULL OR c.title ILIKE '%' || $3 || '%')";

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM courses c JOIN users e ON e.id = c.educator_id {WHERE}"
        ))
        .bind(filters.school_id)
        .bind(filters.educator_id)
        .bind(filters.title.as_deref())
        .fetch_one(db)
        .await?;

        let courses = sqlx::query_as::<_, Course>(&format!(
            "{COURSE_SELECT} {WHERE} ORDER BY c.created_at DESC, c.id DESC LIMIT $4 OFFSET $5"
        ))
        .bind(filters.school_id)
        .bind(filters.educator_id)
        .bind(filters.title.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error fetching courses");
            AppError::from(e)
        })?;

        Ok(Paginated::new(courses, total, &filters.pagination))
    }

    #[instrument(skip(db, claims), fields(course.id = %id, db.operation = "SELECT", db.table = "courses"))]
    pub async fn get_course(
        db: &PgPool,
        claims: Option<&Claims>,
        id: CourseId,
    ) -> Result<Course, AppError> {
        authorize(claims, Action::CourseRead, &Target::none())?;

        let mut conn = db.acquire().await?;
        Self::fetch(&mut conn, id).await
    }

    /// Educators create courses they teach; managers name the educator.
    #[instrument(skip(db, claims, dto), fields(course.title = %dto.title, db.operation = "INSERT", db.table = "courses"))]
    pub async fn create_course(
        db: &PgPool,
        claims: &Claims,
        dto: CreateCourseDto,
    ) -> Result<Course, AppError> {
        let school_id = target_school(claims, dto.school_id)?;

        let mut tx = db.begin().await?;

        let school = load_school_scope(&mut tx, school_id).await?;
        authorize(Some(claims), Action::CourseCreate, &school.target())?;

        let educator_id = match claims.role {
            Role::Educator => {
                if dto.educator_id.is_some_and(|id| id != claims.sub) {
                    check_fields(claims.role, Entity::Course, &["educator_id"])?;
                }
                claims.sub
            }
            _ => dto
                .educator_id
                .ok_or_else(|| AppError::bad_request(anyhow!("educator_id is required")))?,
        };

        let educator = lock_member(&mut tx, educator_id).await?;
        check_educator(&educator, school_id)?;
        check_course_title(&mut tx, school_id, &dto.title, None).await?;

        let id: CourseId = sqlx::query_scalar(
            "INSERT INTO courses (title, description, educator_id, school_id)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(&dto.title)
        .bind(&dto.description)
        .bind(educator.id)
        .bind(school_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, TITLE_KEY, GuardError::DuplicateTitle))?;

        let course = Self::fetch(&mut tx, id).await?;
        tx.commit().await?;

        info!(course.id = %course.id, school.id = %school_id, "Course created");
        Ok(course)
    }

    #[instrument(skip(db, claims, dto), fields(course.id = %id, db.operation = "UPDATE", db.table = "courses"))]
    pub async fn update_course(
        db: &PgPool,
        claims: &Claims,
        id: CourseId,
        dto: UpdateCourseDto,
    ) -> Result<Course, AppError> {
        let fields = dto.changed_fields();
        if fields.is_empty() {
            return Err(AppError::bad_request(anyhow!("No fields to update")));
        }

        let mut tx = db.begin().await?;

        sqlx::query("SELECT id FROM courses WHERE id = $1 FOR UPDATE")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let course = load_course_scope(&mut tx, id, Some(claims.sub)).await?;
        authorize(Some(claims), Action::CourseUpdate, &course.target())?;
        check_fields(claims.role, Entity::Course, &fields)?;

        if let Some(title) = &dto.title {
            check_course_title(&mut tx, course.school_id, title, Some(id)).await?;
        }

        let educator_id: Option<UserId> = match dto.educator_id {
            Some(public_id) => {
                let educator = lock_member(&mut tx, public_id).await?;
                check_educator(&educator, course.school_id)?;
                Some(educator.id)
            }
            None => None,
        };

        sqlx::query(
            "UPDATE courses
             SET title = COALESCE($1, title),
                 description = COALESCE($2, description),
                 educator_id = COALESCE($3, educator_id),
                 updated_at = NOW()
             WHERE id = $4",
        )
        .bind(dto.title.as_deref())
        .bind(dto.description.as_deref())
        .bind(educator_id)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, TITLE_KEY, GuardError::DuplicateTitle))?;

        let updated = Self::fetch(&mut tx, id).await?;
        tx.commit().await?;

        info!(course.id = %id, fields = ?fields, "Course updated");
        Ok(updated)
    }

    /// Removes the course with its enrollments, attendance, messages and
    /// resources.
    #[instrument(skip(db, claims), fields(course.id = %id, db.operation = "DELETE", db.table = "courses"))]
    pub async fn delete_course(
        db: &PgPool,
        claims: &Claims,
        id: CourseId,
    ) -> Result<CascadeSummary, AppError> {
        let mut tx = db.begin().await?;

        sqlx::query("SELECT id FROM courses WHERE id = $1 FOR UPDATE")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let course = load_course_scope(&mut tx, id, Some(claims.sub)).await?;
        authorize(Some(claims), Action::CourseDelete, &course.target())?;

        let summary = delete_cascade(&mut tx, Entity::Course, &[id.into_inner()]).await?;
        tx.commit().await?;

        metrics::track_cascade_delete(Entity::Course.table());
        info!(
            course.id = %id,
            enrollments = summary.deleted(Entity::Enrollment),
            attendance = summary.deleted(Entity::Attendance),
            "Course deleted"
        );

        Ok(summary)
    }
}
