use anyhow::anyhow;
use jifunze_auth::{Action, Claims, Target};
use jifunze_core::{AppError, Paginated};
use jifunze_models::relations::Entity;
use jifunze_models::{
    CreateEnrollmentDto, Enrollment, EnrollmentFilterParams, EnrollmentId, PublicId, SchoolId,
};
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::{debug, info, instrument};

use crate::cascade::delete_cascade;
use crate::guard::{GuardError, check_enrollment, lock_member, map_unique_violation};
use crate::metrics;
use crate::utils::auth_helpers::{Visibility, authorize, load_course_scope};

const ENROLLMENT_SELECT: &str = "SELECT en.id, st.public_id AS user_id, en.course_id, c.school_id,
        en.date_enrolled, en.created_at, en.updated_at
     FROM enrollments en
     JOIN users st ON st.id = en.user_id
     JOIN courses c ON c.id = en.course_id";

#[derive(Debug, FromRow)]
struct EnrollmentScope {
    school_id: SchoolId,
    school_owner: PublicId,
    student: PublicId,
}

impl EnrollmentScope {
    fn target(&self) -> Target {
        Target::school(self.school_id, self.school_owner).with_owner(self.student)
    }
}

pub struct EnrollmentService;

impl EnrollmentService {
    async fn fetch(conn: &mut PgConnection, id: EnrollmentId) -> Result<Enrollment, AppError> {
        sqlx::query_as::<_, Enrollment>(&format!("{ENROLLMENT_SELECT} WHERE en.id = $1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Enrollment not found")))
    }

    async fn load_scope(
        conn: &mut PgConnection,
        id: EnrollmentId,
    ) -> Result<EnrollmentScope, AppError> {
        sqlx::query_as::<_, EnrollmentScope>(
            "SELECT c.school_id, o.public_id AS school_owner, st.public_id AS student
             FROM enrollments en
             JOIN users st ON st.id = en.user_id
             JOIN courses c ON c.id = en.course_id
             JOIN schools s ON s.id = c.school_id
             JOIN users o ON o.id = s.owner_id
             WHERE en.id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Enrollment not found")))
    }

    /// Enrolls a student. The guard check and the insert share one
    /// transaction; the unique index settles concurrent duplicates.
    #[instrument(skip(db, claims, dto), fields(course.id = %dto.course_id, user.public_id = %dto.user_id, db.operation = "INSERT", db.table = "enrollments"))]
    pub async fn create_enrollment(
        db: &PgPool,
        claims: &Claims,
        dto: CreateEnrollmentDto,
    ) -> Result<Enrollment, AppError> {
        let mut tx = db.begin().await?;

        let course = load_course_scope(&mut tx, dto.course_id, None).await?;
        authorize(Some(claims), Action::EnrollmentCreate, &course.target())?;

        let student = lock_member(&mut tx, dto.user_id).await?;
        check_enrollment(&mut tx, &student, &course).await?;

        let id: EnrollmentId = sqlx::query_scalar(
            "INSERT INTO enrollments (user_id, course_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(student.id)
        .bind(course.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            map_unique_violation(e, "enrollments_user_course_key", GuardError::DuplicateEnrollment)
        })?;

        let enrollment = Self::fetch(&mut tx, id).await?;
        tx.commit().await?;

        metrics::track_enrollment_created();
        info!(enrollment.id = %id, "Student enrolled");

        Ok(enrollment)
    }

    #[instrument(skip(db, claims, filters), fields(db.operation = "SELECT", db.table = "enrollments"))]
    pub async fn list_enrollments(
        db: &PgPool,
        claims: &Claims,
        filters: EnrollmentFilterParams,
    ) -> Result<Paginated<Enrollment>, AppError> {
        let mut conn = db.acquire().await?;
        let visibility = Visibility::for_claims(claims)?;

        let target = match filters.course_id {
            Some(course_id) => {
                let course = load_course_scope(&mut conn, course_id, Some(claims.sub)).await?;
                Target {
                    owner: visibility.student,
                    ..course.target()
                }
            }
            None => visibility.target(),
        };
        authorize(Some(claims), Action::EnrollmentList, &target)?;

        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();
        debug!(limit, offset, filter.course_id = ?filters.course_id, "Fetching enrollments");

        const WHERE: &str = "JOIN schools s ON s.id = c.school_id
             JOIN users o ON o.id = s.owner_id
             WHERE ($1::BIGINT IS NULL OR c.school_id = $1)
               AND ($2::UUID IS NULL OR o.public_id = $2)
               AND ($3::UUID IS NULL OR st.public_id = $3)
               AND ($4::BIGINT IS NULL OR en.course_id = $4)
               AND ($5::UUID IS NULL OR st.public_id = $5)";

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*)
             FROM enrollments en
             JOIN users st ON st.id = en.user_id
             JOIN courses c ON c.id = en.course_id
             {WHERE}"
        ))
        .bind(visibility.school_id)
        .bind(visibility.owner)
        .bind(visibility.student)
        .bind(filters.course_id)
        .bind(filters.user_id)
        .fetch_one(&mut *conn)
        .await?;

        let enrollments = sqlx::query_as::<_, Enrollment>(&format!(
            "{ENROLLMENT_SELECT} {WHERE}
             ORDER BY en.date_enrolled DESC, en.id DESC
             LIMIT $6 OFFSET $7"
        ))
        .bind(visibility.school_id)
        .bind(visibility.owner)
        .bind(visibility.student)
        .bind(filters.course_id)
        .bind(filters.user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await?;

        Ok(Paginated::new(enrollments, total, &filters.pagination))
    }

    #[instrument(skip(db, claims), fields(enrollment.id = %id, db.operation = "SELECT", db.table = "enrollments"))]
    pub async fn get_enrollment(
        db: &PgPool,
        claims: &Claims,
        id: EnrollmentId,
    ) -> Result<Enrollment, AppError> {
        let mut conn = db.acquire().await?;

        let scope = Self::load_scope(&mut conn, id).await?;
        authorize(Some(claims), Action::EnrollmentRead, &scope.target())?;

        Self::fetch(&mut conn, id).await
    }

    #[instrument(skip(db, claims), fields(enrollment.id = %id, db.operation = "DELETE", db.table = "enrollments"))]
    pub async fn delete_enrollment(
        db: &PgPool,
        claims: &Claims,
        id: EnrollmentId,
    ) -> Result<(), AppError> {
        let mut tx = db.begin().await?;

        let scope = Self::load_scope(&mut tx, id).await?;
        authorize(Some(claims), Action::EnrollmentDelete, &scope.target())?;

        delete_cascade(&mut tx, Entity::Enrollment, &[id.into_inner()]).await?;
        tx.commit().await?;

        info!(enrollment.id = %id, "Enrollment removed");
        Ok(())
    }
}
