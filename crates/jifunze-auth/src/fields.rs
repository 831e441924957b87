//! Field-level write permissions for partial updates.
//!
//! The Scope Resolver decides whether a caller may update a record at all;
//! this table narrows which of its fields each role may change. A field not
//! listed for an entity cannot be changed through an update request.

use anyhow::anyhow;
use jifunze_core::AppError;
use jifunze_models::Role;
use jifunze_models::relations::Entity;
use serde_json::json;

const ALL: &[Role] = &[Role::Student, Role::Educator, Role::Manager];
const STAFF: &[Role] = &[Role::Educator, Role::Manager];
const MANAGER: &[Role] = &[Role::Manager];

/// `(entity, field, roles that may write it)`
pub const FIELD_PERMISSIONS: &[(Entity, &str, &[Role])] = &[
    (Entity::User, "name", ALL),
    (Entity::User, "email", ALL),
    (Entity::User, "role", MANAGER),
    (Entity::School, "name", MANAGER),
    (Entity::School, "address", MANAGER),
    (Entity::School, "phone", MANAGER),
    (Entity::Course, "title", STAFF),
    (Entity::Course, "description", STAFF),
    (Entity::Course, "educator_id", MANAGER),
    (Entity::Attendance, "date", STAFF),
    (Entity::Attendance, "status", STAFF),
    (Entity::Attendance, "verified_by", STAFF),
    (Entity::Message, "content", ALL),
    (Entity::Resource, "title", STAFF),
    (Entity::Resource, "url", STAFF),
    (Entity::Resource, "type", STAFF),
];

pub fn can_write(role: Role, entity: Entity, field: &str) -> bool {
    FIELD_PERMISSIONS
        .iter()
        .any(|(e, f, roles)| *e == entity && *f == field && roles.contains(&role))
}

/// Checks every field in `fields`.
///
/// # Errors
///
/// `Forbidden` naming the rejected fields in `errors.fields`.
pub fn check_fields(role: Role, entity: Entity, fields: &[&str]) -> Result<(), AppError> {
    let denied: Vec<&str> = fields
        .iter()
        .copied()
        .filter(|field| !can_write(role, entity, field))
        .collect();

    if denied.is_empty() {
        return Ok(());
    }

    Err(AppError::forbidden(anyhow!(
        "You may not change: {}",
        denied.join(", ")
    ))
    .with_details(json!({ "fields": denied })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jifunze_core::ErrorKind;

    #[test]
    fn test_only_managers_change_roles() {
        assert!(can_write(Role::Manager, Entity::User, "role"));
        assert!(!can_write(Role::Educator, Entity::User, "role"));
        assert!(!can_write(Role::Student, Entity::User, "role"));
        assert!(can_write(Role::Student, Entity::User, "name"));
    }

    #[test]
    fn test_school_id_is_never_writable() {
        for role in Role::ALL {
            assert!(!can_write(role, Entity::User, "school_id"));
        }
    }

    #[test]
    fn test_course_educator_is_manager_only() {
        assert!(check_fields(Role::Educator, Entity::Course, &["title", "description"]).is_ok());
        let err = check_fields(Role::Educator, Entity::Course, &["title", "educator_id"])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
        assert_eq!(err.details.unwrap()["fields"], json!(["educator_id"]));
    }

    #[test]
    fn test_students_cannot_touch_attendance() {
        assert!(check_fields(Role::Student, Entity::Attendance, &["status"]).is_err());
        assert!(check_fields(Role::Educator, Entity::Attendance, &["status"]).is_ok());
    }

    #[test]
    fn test_empty_update_is_allowed() {
        assert!(check_fields(Role::Student, Entity::Resource, &[]).is_ok());
    }
}
