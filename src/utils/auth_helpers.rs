//! Loading the tenant facts that authorization decisions are made on.
//!
//! Each loader reads the live rows behind a request (school owner, course
//! educator, the caller's enrollment) and turns them into a
//! [`Target`] for the Scope Resolver. Loaders take a connection so they run
//! inside the caller's transaction.

use anyhow::anyhow;
use jifunze_auth::{Action, Claims, Decision, Target, scope};
use jifunze_core::AppError;
use jifunze_models::{CourseId, PublicId, Role, SchoolId, UserId};
use sqlx::{FromRow, PgConnection};
use tracing::debug;

use crate::metrics;

/// A school and its owning manager.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct SchoolScope {
    pub id: SchoolId,
    pub owner_id: UserId,
    pub owner: PublicId,
}

impl SchoolScope {
    pub fn target(&self) -> Target {
        Target::school(self.id, self.owner)
    }
}

/// A course with its tenant, educator and the caller's enrollment.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct CourseScope {
    pub id: CourseId,
    pub school_id: SchoolId,
    pub school_owner: PublicId,
    pub educator_id: UserId,
    pub educator: PublicId,
    pub enrolled: bool,
}

impl CourseScope {
    pub fn target(&self) -> Target {
        Target::school(self.school_id, self.school_owner)
            .with_educator(self.educator)
            .with_enrollment(self.enrolled)
    }
}

/// A user account with the owner of its school.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct UserScope {
    pub id: UserId,
    pub public_id: PublicId,
    pub role: Role,
    pub school_id: Option<SchoolId>,
    pub school_owner: Option<PublicId>,
}

impl UserScope {
    pub fn target(&self) -> Target {
        Target {
            school_id: self.school_id,
            school_owner: self.school_owner,
            owner: Some(self.public_id),
            ..Target::default()
        }
    }
}

pub async fn load_school_scope(
    conn: &mut PgConnection,
    school_id: SchoolId,
) -> Result<SchoolScope, AppError> {
    sqlx::query_as::<_, SchoolScope>(
        "SELECT s.id, s.owner_id, o.public_id AS owner
         FROM schools s
         JOIN users o ON o.id = s.owner_id
         WHERE s.id = $1",
    )
    .bind(school_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found(anyhow!("School not found")))
}

/// `caller` decides the `enrolled` flag.
pub async fn load_course_scope(
    conn: &mut PgConnection,
    course_id: CourseId,
    caller: Option<PublicId>,
) -> Result<CourseScope, AppError> {
    sqlx::query_as::<_, CourseScope>(
        "SELECT c.id, c.school_id, o.public_id AS school_owner,
                c.educator_id, e.public_id AS educator,
                EXISTS (
                    SELECT 1 FROM enrollments en
                    JOIN users st ON st.id = en.user_id
                    WHERE en.course_id = c.id AND st.public_id = $2
                ) AS enrolled
         FROM courses c
         JOIN schools s ON s.id = c.school_id
         JOIN users o ON o.id = s.owner_id
         JOIN users e ON e.id = c.educator_id
         WHERE c.id = $1",
    )
    .bind(course_id)
    .bind(caller)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found(anyhow!("Course not found")))
}

pub async fn load_user_scope(
    conn: &mut PgConnection,
    public_id: PublicId,
) -> Result<UserScope, AppError> {
    sqlx::query_as::<_, UserScope>(
        "SELECT u.id, u.public_id, u.role, u.school_id, o.public_id AS school_owner
         FROM users u
         LEFT JOIN schools s ON s.id = u.school_id
         LEFT JOIN users o ON o.id = s.owner_id
         WHERE u.public_id = $1",
    )
    .bind(public_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found(anyhow!("User not found")))
}

/// Internal id of the authenticated caller.
pub async fn caller_id(conn: &mut PgConnection, claims: &Claims) -> Result<UserId, AppError> {
    sqlx::query_scalar::<_, UserId>("SELECT id FROM users WHERE public_id = $1")
        .bind(claims.sub)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::unauthorized(anyhow!("Account no longer exists")))
}

/// Runs the Scope Resolver and converts a denial into an error.
pub fn authorize(claims: Option<&Claims>, action: Action, target: &Target) -> Result<(), AppError> {
    let decision = scope::authorize(claims, action, target);

    if let Decision::Deny(reason) = decision {
        debug!(?action, ?reason, "Authorization denied");
        metrics::track_authorization_denied(&format!("{:?}", reason));
    }

    decision.into_result(action)
}

/// Rows a caller may list: the caller's school, or every school a manager
/// owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    pub school_id: Option<SchoolId>,
    pub owner: Option<PublicId>,
    /// Students only see their own records.
    pub student: Option<PublicId>,
}

impl Visibility {
    pub fn for_claims(claims: &Claims) -> Result<Self, AppError> {
        match claims.role {
            Role::Manager => Ok(Self {
                school_id: None,
                owner: Some(claims.sub),
                student: None,
            }),
            Role::Educator | Role::Student => {
                let school_id = claims.school_id.ok_or_else(|| {
                    AppError::cross_tenant(anyhow!("Your account is not assigned to a school"))
                })?;
                Ok(Self {
                    school_id: Some(school_id),
                    owner: None,
                    student: (claims.role == Role::Student).then_some(claims.sub),
                })
            }
        }
    }

    /// The caller's own tenant as an authorization target.
    pub fn target(&self) -> Target {
        Target {
            school_id: self.school_id,
            school_owner: self.owner,
            owner: self.student,
            ..Target::default()
        }
    }
}

/// School a new school-scoped record goes into: the requested one, or the
/// caller's own school.
pub fn target_school(claims: &Claims, requested: Option<SchoolId>) -> Result<SchoolId, AppError> {
    requested.or(claims.school_id).ok_or_else(|| {
        AppError::bad_request(anyhow!("school_id is required")).with_details(serde_json::json!({
            "fields": { "school_id": "required" }
        }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jifunze_auth::TokenType;
    use jifunze_core::ErrorKind;
    use uuid::Uuid;

    fn claims(role: Role, school_id: Option<SchoolId>) -> Claims {
        Claims {
            sub: PublicId::new(),
            role,
            school_id,
            jti: Uuid::new_v4(),
            sid: Uuid::new_v4(),
            token_type: TokenType::Access,
            exp: i64::MAX,
            iat: 0,
        }
    }

    #[test]
    fn test_student_visibility_is_own_records() {
        let student = claims(Role::Student, Some(SchoolId(4)));
        let visibility = Visibility::for_claims(&student).unwrap();
        assert_eq!(visibility.school_id, Some(SchoolId(4)));
        assert_eq!(visibility.student, Some(student.sub));
    }

    #[test]
    fn test_manager_visibility_is_owned_schools() {
        let manager = claims(Role::Manager, None);
        let visibility = Visibility::for_claims(&manager).unwrap();
        assert_eq!(visibility.owner, Some(manager.sub));
        assert!(visibility.school_id.is_none());
    }

    #[test]
    fn test_own_tenant_target_is_in_scope() {
        let manager = claims(Role::Manager, None);
        let target = Visibility::for_claims(&manager).unwrap().target();
        assert!(scope::authorize(Some(&manager), Action::EnrollmentList, &target).is_allowed());

        let student = claims(Role::Student, Some(SchoolId(4)));
        let target = Visibility::for_claims(&student).unwrap().target();
        assert!(scope::authorize(Some(&student), Action::AttendanceList, &target).is_allowed());
        assert_eq!(
            scope::authorize(Some(&student), Action::UserList, &target),
            Decision::Deny(jifunze_auth::DenyReason::InsufficientRole)
        );
    }

    #[test]
    fn test_target_school_requires_some_school() {
        let manager = claims(Role::Manager, None);
        let err = target_school(&manager, None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValidationError);
        assert_eq!(target_school(&manager, Some(SchoolId(2))).unwrap(), SchoolId(2));

        let educator = claims(Role::Educator, Some(SchoolId(7)));
        assert_eq!(target_school(&educator, None).unwrap(), SchoolId(7));
    }

    #[test]
    fn test_user_scope_target() {
        let scope = UserScope {
            id: UserId(1),
            public_id: PublicId::new(),
            role: Role::Student,
            school_id: Some(SchoolId(3)),
            school_owner: Some(PublicId::new()),
        };
        let target = scope.target();
        assert_eq!(target.owner, Some(scope.public_id));
        assert_eq!(target.school_id, Some(SchoolId(3)));
    }
}
