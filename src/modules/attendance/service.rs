use anyhow::anyhow;
use jifunze_auth::{Action, Claims, Target, check_fields};
use jifunze_core::{AppError, Paginated};
use jifunze_models::relations::Entity;
use jifunze_models::{
    Attendance, AttendanceFilterParams, AttendanceId, CourseId, CreateAttendanceDto, PublicId,
    SchoolId, UpdateAttendanceDto, UserId,
};
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::{debug, info, instrument};

use crate::cascade::delete_cascade;
use crate::guard::{
    GuardError, check_attendance, check_verifier, lock_member, map_unique_violation,
};
use crate::utils::auth_helpers::{CourseScope, Visibility, authorize, load_course_scope};

const ATTENDANCE_SELECT: &str = "SELECT a.id, st.public_id AS user_id, a.course_id, c.school_id,
        a.date, a.status, v.public_id AS verified_by, a.created_at, a.updated_at
     FROM attendance a
     JOIN users st ON st.id = a.user_id
     JOIN courses c ON c.id = a.course_id
     LEFT JOIN users v ON v.id = a.verified_by";

const DATE_KEY: &str = "attendance_user_course_date_key";

#[derive(Debug, FromRow)]
struct AttendanceScope {
    course_id: CourseId,
    school_id: SchoolId,
    school_owner: PublicId,
    student: PublicId,
}

impl AttendanceScope {
    fn target(&self) -> Target {
        Target::school(self.school_id, self.school_owner).with_owner(self.student)
    }
}

pub struct AttendanceService;

impl AttendanceService {
    async fn fetch(conn: &mut PgConnection, id: AttendanceId) -> Result<Attendance, AppError> {
        sqlx::query_as::<_, Attendance>(&format!("{ATTENDANCE_SELECT} WHERE a.id = $1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Attendance record not found")))
    }

    /// `lock` takes a row lock on the record for the rest of the transaction.
    async fn load_scope(
        conn: &mut PgConnection,
        id: AttendanceId,
        lock: bool,
    ) -> Result<AttendanceScope, AppError> {
        let sql = format!(
            "SELECT a.course_id, c.school_id, o.public_id AS school_owner, st.public_id AS student
             FROM attendance a
             JOIN users st ON st.id = a.user_id
             JOIN courses c ON c.id = a.course_id
             JOIN schools s ON s.id = c.school_id
             JOIN users o ON o.id = s.owner_id
             WHERE a.id = $1 {}",
            if lock { "FOR UPDATE OF a" } else { "" }
        );

        sqlx::query_as::<_, AttendanceScope>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Attendance record not found")))
    }

    async fn resolve_verifier(
        conn: &mut PgConnection,
        verifier: Option<PublicId>,
        course: &CourseScope,
    ) -> Result<Option<UserId>, AppError> {
        let Some(public_id) = verifier else {
            return Ok(None);
        };

        let member = lock_member(conn, public_id).await?;
        check_verifier(&member, course)?;
        Ok(Some(member.id))
    }

    #[instrument(skip(db, claims, dto), fields(course.id = %dto.course_id, date = %dto.date, db.operation = "INSERT", db.table = "attendance"))]
    pub async fn create_attendance(
        db: &PgPool,
        claims: &Claims,
        dto: CreateAttendanceDto,
    ) -> Result<Attendance, AppError> {
        let mut tx = db.begin().await?;

        let course = load_course_scope(&mut tx, dto.course_id, None).await?;
        authorize(Some(claims), Action::AttendanceCreate, &course.target())?;

        let student = lock_member(&mut tx, dto.user_id).await?;
        check_attendance(&mut tx, &student, &course, dto.date, None).await?;
        let verifier = Self::resolve_verifier(&mut tx, dto.verified_by, &course).await?;

        let id: AttendanceId = sqlx::query_scalar(
            "INSERT INTO attendance (user_id, course_id, date, status, verified_by)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(student.id)
        .bind(course.id)
        .bind(dto.date)
        .bind(dto.status)
        .bind(verifier)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, DATE_KEY, GuardError::DuplicateAttendance))?;

        let record = Self::fetch(&mut tx, id).await?;
        tx.commit().await?;

        info!(attendance.id = %id, status = %record.status, "Attendance recorded");
        Ok(record)
    }

    /// Students only ever see their own records.
    #[instrument(skip(db, claims, filters), fields(db.operation = "SELECT", db.table = "attendance"))]
    pub async fn list_attendance(
        db: &PgPool,
        claims: &Claims,
        filters: AttendanceFilterParams,
    ) -> Result<Paginated<Attendance>, AppError> {
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
        authorize(Some(claims), Action::AttendanceList, &target)?;

        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();
        debug!(
            limit,
            offset,
            filter.course_id = ?filters.course_id,
            filter.date = ?filters.date,
            filter.status = ?filters.status,
            "Fetching attendance"
        );

        const WHERE: &str = "JOIN schools s ON s.id = c.school_id
             JOIN users o ON o.id = s.owner_id
             WHERE ($1::BIGINT IS NULL OR c.school_id = $1)
               AND ($2::UUID IS NULL OR o.public_id = $2)
               AND ($3::UUID IS NULL OR st.public_id = $3)
               AND ($4::BIGINT IS NULL OR a.course_id = $4)
               AND ($5::UUID IS NULL OR st.public_id = $5)
               AND ($6::DATE IS NULL OR a.date = $6)
               AND ($7::TEXT IS NULL OR a.status = $7)";

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*)
             FROM attendance a
             JOIN users st ON st.id = a.user_id
             JOIN courses c ON c.id = a.course_id
             {WHERE}"
        ))
        .bind(visibility.school_id)
        .bind(visibility.owner)
        .bind(visibility.student)
        .bind(filters.course_id)
        .bind(filters.user_id)
        .bind(filters.date)
        .bind(filters.status)
        .fetch_one(&mut *conn)
        .await?;

        let records = sqlx::query_as::<_, Attendance>(&format!(
            "{ATTENDANCE_SELECT} {WHERE}
             ORDER BY a.date DESC, a.id DESC
             LIMIT $8 OFFSET $9"
        ))
        .bind(visibility.school_id)
        .bind(visibility.owner)
        .bind(visibility.student)
        .bind(filters.course_id)
        .bind(filters.user_id)
        .bind(filters.date)
        .bind(filters.status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await?;

        Ok(Paginated::new(records, total, &filters.pagination))
    }

    #[instrument(skip(db, claims), fields(attendance.id = %id, db.operation = "SELECT", db.table = "attendance"))]
    pub async fn get_attendance(
        db: &PgPool,
        claims: &Claims,
        id: AttendanceId,
    ) -> Result<Attendance, AppError> {
        let mut conn = db.acquire().await?;

        let scope = Self::load_scope(&mut conn, id, false).await?;
        authorize(Some(claims), Action::AttendanceRead, &scope.target())?;

        Self::fetch(&mut conn, id).await
    }

    /// A new date is checked against the student's other records for the
    /// course; a new verifier must be staff of the course's school.
    #[instrument(skip(db, claims, dto), fields(attendance.id = %id, db.operation = "UPDATE", db.table = "attendance"))]
    pub async fn update_attendance(
        db: &PgPool,
        claims: &Claims,
        id: AttendanceId,
        dto: UpdateAttendanceDto,
    ) -> Result<Attendance, AppError> {
        let fields = dto.changed_fields();
        if fields.is_empty() {
            return Err(AppError::bad_request(anyhow!("No fields to update")));
        }

        let mut tx = db.begin().await?;

        let scope = Self::load_scope(&mut tx, id, true).await?;
        authorize(Some(claims), Action::AttendanceUpdate, &scope.target())?;
        check_fields(claims.role, Entity::Attendance, &fields)?;

        let course = load_course_scope(&mut tx, scope.course_id, None).await?;

        if let Some(date) = dto.date {
            let student = lock_member(&mut tx, scope.student).await?;
            check_attendance(&mut tx, &student, &course, date, Some(id)).await?;
        }
        let verifier = Self::resolve_verifier(&mut tx, dto.verified_by, &course).await?;

        sqlx::query(
            "UPDATE attendance
             SET date = COALESCE($1, date),
                 status = COALESCE($2, status),
                 verified_by = COALESCE($3, verified_by),
                 updated_at = NOW()
             WHERE id = $4",
        )
        .bind(dto.date)
        .bind(dto.status)
        .bind(verifier)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, DATE_KEY, GuardError::DuplicateAttendance))?;

        let updated = Self::fetch(&mut tx, id).await?;
        tx.commit().await?;

        info!(attendance.id = %id, fields = ?fields, "Attendance updated");
        Ok(updated)
    }

    #[instrument(skip(db, claims), fields(attendance.id = %id, db.operation = "DELETE", db.table = "attendance"))]
    pub async fn delete_attendance(
        db: &PgPool,
        claims: &Claims,
        id: AttendanceId,
    ) -> Result<(), AppError> {
        let mut tx = db.begin().await?;

        let scope = Self::load_scope(&mut tx, id, true).await?;
        authorize(Some(claims), Action::AttendanceDelete, &scope.target())?;

        delete_cascade(&mut tx, Entity::Attendance, &[id.into_inner()]).await?;
        tx.commit().await?;

        info!(attendance.id = %id, "Attendance record deleted");
        Ok(())
    }
}
