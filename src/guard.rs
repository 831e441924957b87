//! Consistency Guard: cross-entity invariants checked before a write.
//!
//! Every check runs on the caller's transaction and locks the rows it reads
//! with `FOR SHARE`, so a concurrent write cannot invalidate a check between
//! the read and the commit. The unique indexes in the schema back up the
//! duplicate checks; [`map_unique_violation`] turns a lost race into the
//! same error the check would have produced.

use anyhow::anyhow;
use chrono::NaiveDate;
use jifunze_core::{AppError, ErrorKind};
use jifunze_models::{AttendanceId, CourseId, MessageId, PublicId, Role, SchoolId, UserId};
use serde_json::json;
use sqlx::{FromRow, PgConnection};
use tracing::debug;

use crate::utils::auth_helpers::CourseScope;

#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("Student and course belong to different schools")]
    TenantMismatch,
    #[error("Only students can be enrolled or marked for attendance")]
    NotStudent,
    #[error("Student is already enrolled in this course")]
    DuplicateEnrollment,
    #[error("Attendance is already recorded for this student, course and date")]
    DuplicateAttendance,
    #[error("A course with this title already exists in the school")]
    DuplicateTitle,
    #[error("User is a {actual}, not a {expected}")]
    RoleMismatch { expected: Role, actual: Role },
    #[error("Managers own schools and cannot be assigned to one")]
    ManagerAssignment,
    #[error("Role changes to or from manager are not allowed")]
    ManagerRoleChange,
    #[error("User has course history in another school")]
    HistoryExists,
    #[error("Record is still referenced by {0}")]
    HasDependents(&'static str),
    #[error("Course educator must be an educator of the course's school")]
    InvalidEducator,
    #[error("Attendance can only be verified by an educator or manager of the school")]
    InvalidVerifier,
    #[error("Replies must reference a message in the same course")]
    InvalidParent,
}

impl GuardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TenantMismatch => ErrorKind::TenantMismatch,
            Self::DuplicateEnrollment
            | Self::DuplicateAttendance
            | Self::DuplicateTitle
            | Self::HistoryExists
            | Self::HasDependents(_) => ErrorKind::Conflict,
            Self::NotStudent
            | Self::RoleMismatch { .. }
            | Self::ManagerAssignment
            | Self::ManagerRoleChange
            | Self::InvalidEducator
            | Self::InvalidVerifier
            | Self::InvalidParent => ErrorKind::ValidationError,
        }
    }

    /// Machine-readable reason placed in `errors.reason`.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::TenantMismatch => "tenant_mismatch",
            Self::NotStudent => "not_student",
            Self::DuplicateEnrollment => "duplicate_enrollment",
            Self::DuplicateAttendance => "duplicate_attendance",
            Self::DuplicateTitle => "duplicate_title",
            Self::RoleMismatch { .. } => "role_mismatch",
            Self::ManagerAssignment => "manager_assignment",
            Self::ManagerRoleChange => "manager_role_change",
            Self::HistoryExists => "history_exists",
            Self::HasDependents(_) => "has_dependents",
            Self::InvalidEducator => "invalid_educator",
            Self::InvalidVerifier => "invalid_verifier",
            Self::InvalidParent => "invalid_parent",
        }
    }
}

impl From<GuardError> for AppError {
    fn from(err: GuardError) -> Self {
        let kind = err.kind();
        let mut details = json!({ "reason": err.reason() });
        if let GuardError::HasDependents(table) = err {
            details["dependents"] = json!(table);
        }
        AppError::new(kind, anyhow!(err.to_string())).with_details(details)
    }
}

/// A user row as the guard sees it.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct Member {
    pub id: UserId,
    pub public_id: PublicId,
    pub role: Role,
    pub school_id: Option<SchoolId>,
}

/// Loads and share-locks a user so their role and school cannot change
/// until the transaction ends.
pub async fn lock_member(conn: &mut PgConnection, public_id: PublicId) -> Result<Member, AppError> {
    sqlx::query_as::<_, Member>(
        "SELECT id, public_id, role, school_id FROM users WHERE public_id = $1 FOR SHARE",
    )
    .bind(public_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found(anyhow!("User not found")))
}

/// Share-locks the course row so its school cannot change under the check.
async fn lock_course(conn: &mut PgConnection, course_id: CourseId) -> Result<(), AppError> {
    sqlx::query("SELECT id FROM courses WHERE id = $1 FOR SHARE")
        .bind(course_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn check_enrollment(
    conn: &mut PgConnection,
    student: &Member,
    course: &CourseScope,
) -> Result<(), AppError> {
    lock_course(conn, course.id).await?;

    if student.school_id != Some(course.school_id) {
        debug!(student = %student.public_id, course = %course.id, "Enrollment crosses schools");
        return Err(GuardError::TenantMismatch.into());
    }
    if student.role != Role::Student {
        return Err(GuardError::NotStudent.into());
    }

    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM enrollments WHERE user_id = $1 AND course_id = $2)",
    )
    .bind(student.id)
    .bind(course.id)
    .fetch_one(&mut *conn)
    .await?;

    if exists {
        return Err(GuardError::DuplicateEnrollment.into());
    }

    Ok(())
}

/// Verifiers are educators of the course's school or the school's manager.
pub fn check_verifier(verifier: &Member, course: &CourseScope) -> Result<(), AppError> {
    let valid = match verifier.role {
        Role::Educator => verifier.school_id == Some(course.school_id),
        Role::Manager => verifier.public_id == course.school_owner,
        Role::Student => false,
    };

    if valid {
        Ok(())
    } else {
        Err(GuardError::InvalidVerifier.into())
    }
}

/// `existing` excludes the record being updated from the duplicate check.
pub async fn check_attendance(
    conn: &mut PgConnection,
    student: &Member,
    course: &CourseScope,
    date: NaiveDate,
    existing: Option<AttendanceId>,
) -> Result<(), AppError> {
    lock_course(conn, course.id).await?;

    if student.school_id != Some(course.school_id) {
        return Err(GuardError::TenantMismatch.into());
    }
    if student.role != Role::Student {
        return Err(GuardError::NotStudent.into());
    }

    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT 1 FROM attendance
            WHERE user_id = $1 AND course_id = $2 AND date = $3
              AND ($4::BIGINT IS NULL OR id <> $4)
        )",
    )
    .bind(student.id)
    .bind(course.id)
    .bind(date)
    .bind(existing)
    .fetch_one(&mut *conn)
    .await?;

    if exists {
        return Err(GuardError::DuplicateAttendance.into());
    }

    Ok(())
}

/// Titles compare case-insensitively within a school.
pub async fn check_course_title(
    conn: &mut PgConnection,
    school_id: SchoolId,
    title: &str,
    existing: Option<CourseId>,
) -> Result<(), AppError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT 1 FROM courses
            WHERE school_id = $1 AND lower(title) = lower($2)
              AND ($3::BIGINT IS NULL OR id <> $3)
        )",
    )
    .bind(school_id)
    .bind(title)
    .bind(existing)
    .fetch_one(&mut *conn)
    .await?;

    if exists {
        return Err(GuardError::DuplicateTitle.into());
    }

    Ok(())
}

pub fn check_educator(educator: &Member, school_id: SchoolId) -> Result<(), AppError> {
    if educator.role == Role::Educator && educator.school_id == Some(school_id) {
        Ok(())
    } else {
        Err(GuardError::InvalidEducator.into())
    }
}

/// A user may be assigned to a school only in their current role, and
/// only while none of their courses, enrollments, attendance, messages or
/// uploaded resources belong to a different school.
pub async fn check_school_assignment(
    conn: &mut PgConnection,
    user: &Member,
    school_id: SchoolId,
    role: Role,
) -> Result<(), AppError> {
    if user.role == Role::Manager || role == Role::Manager {
        return Err(GuardError::ManagerAssignment.into());
    }
    if user.role != role {
        return Err(GuardError::RoleMismatch {
            expected: role,
            actual: user.role,
        }
        .into());
    }

    let history: bool = sqlx::query_scalar(
        "SELECT EXISTS (
                SELECT 1 FROM enrollments e JOIN courses c ON c.id = e.course_id
                WHERE e.user_id = $1 AND c.school_id <> $2
            ) OR EXISTS (
                SELECT 1 FROM attendance a JOIN courses c ON c.id = a.course_id
                WHERE a.user_id = $1 AND c.school_id <> $2
            ) OR EXISTS (
                SELECT 1 FROM messages m JOIN courses c ON c.id = m.course_id
                WHERE m.user_id = $1 AND c.school_id <> $2
            ) OR EXISTS (
                SELECT 1 FROM resources r JOIN courses c ON c.id = r.course_id
                WHERE r.uploaded_by = $1 AND c.school_id <> $2
            ) OR EXISTS (
                SELECT 1 FROM courses WHERE educator_id = $1 AND school_id <> $2
            )",
    )
    .bind(user.id)
    .bind(school_id)
    .fetch_one(&mut *conn)
    .await?;

    if history {
        return Err(GuardError::HistoryExists.into());
    }

    Ok(())
}

/// Role changes keep existing records coherent: a student with course
/// history cannot become an educator, and an educator still teaching
/// cannot become a student.
pub async fn check_role_change(
    conn: &mut PgConnection,
    user: &Member,
    new_role: Role,
) -> Result<(), AppError> {
    if user.role == new_role {
        return Ok(());
    }
    if user.role == Role::Manager || new_role == Role::Manager {
        return Err(GuardError::ManagerRoleChange.into());
    }

    let (sql, table) = match user.role {
        Role::Student => (
            "SELECT EXISTS (SELECT 1 FROM enrollments WHERE user_id = $1)
                 OR EXISTS (SELECT 1 FROM attendance WHERE user_id = $1)",
            "enrollments",
        ),
        _ => (
            "SELECT EXISTS (SELECT 1 FROM courses WHERE educator_id = $1)",
            "courses",
        ),
    };

    let referenced: bool = sqlx::query_scalar(sql)
        .bind(user.id)
        .fetch_one(&mut *conn)
        .await?;

    if referenced {
        return Err(GuardError::HasDependents(table).into());
    }

    Ok(())
}

pub async fn check_reply_parent(
    conn: &mut PgConnection,
    parent_id: MessageId,
    course_id: CourseId,
) -> Result<(), AppError> {
    let parent_course: Option<CourseId> =
        sqlx::query_scalar("SELECT course_id FROM messages WHERE id = $1 FOR SHARE")
            .bind(parent_id)
            .fetch_optional(&mut *conn)
            .await?;

    match parent_course {
        Some(id) if id == course_id => Ok(()),
        _ => Err(GuardError::InvalidParent.into()),
    }
}

/// Maps a unique violation on `constraint` to `guard`; every other error
/// goes through the usual storage classification.
pub fn map_unique_violation(err: sqlx::Error, constraint: &str, guard: GuardError) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() && db_err.constraint() == Some(constraint) {
            debug!(constraint, "Unique constraint caught a concurrent write");
            return guard.into();
        }
    }
    AppError::from(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use jifunze_models::CourseId;

    fn course(school_id: i64, owner: PublicId) -> CourseScope {
        CourseScope {
            id: CourseId(1),
            school_id: SchoolId(school_id),
            school_owner: owner,
            educator_id: UserId(9),
            educator: PublicId::new(),
            enrolled: false,
        }
    }

    fn member(role: Role, school_id: Option<i64>) -> Member {
        Member {
            id: UserId(5),
            public_id: PublicId::new(),
            role,
            school_id: school_id.map(SchoolId),
        }
    }

    #[test]
    fn test_tenant_mismatch_is_bad_request() {
        let err = AppError::from(GuardError::TenantMismatch);
        assert_eq!(err.kind, ErrorKind::TenantMismatch);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.details.unwrap()["reason"], "tenant_mismatch");
    }

    #[test]
    fn test_duplicates_are_conflicts() {
        for guard in [
            GuardError::DuplicateEnrollment,
            GuardError::DuplicateAttendance,
            GuardError::DuplicateTitle,
        ] {
            assert_eq!(AppError::from(guard).status, StatusCode::CONFLICT);
        }
    }

    #[test]
    fn test_dependents_are_named() {
        let err = AppError::from(GuardError::HasDependents("attendance"));
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.details.unwrap()["dependents"], "attendance");
    }

    #[test]
    fn test_verifier_rules() {
        let owner = PublicId::new();
        let scope = course(1, owner);

        assert!(check_verifier(&member(Role::Educator, Some(1)), &scope).is_ok());
        assert!(check_verifier(&member(Role::Educator, Some(2)), &scope).is_err());
        assert!(check_verifier(&member(Role::Student, Some(1)), &scope).is_err());

        let mut manager = member(Role::Manager, None);
        assert!(check_verifier(&manager, &scope).is_err());
        manager.public_id = owner;
        assert!(check_verifier(&manager, &scope).is_ok());
    }

    #[test]
    fn test_educator_must_teach_in_school() {
        assert!(check_educator(&member(Role::Educator, Some(1)), SchoolId(1)).is_ok());
        assert!(check_educator(&member(Role::Educator, Some(2)), SchoolId(1)).is_err());
        assert!(check_educator(&member(Role::Student, Some(1)), SchoolId(1)).is_err());
    }
}
