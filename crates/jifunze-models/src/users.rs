//! User domain models and DTOs.
//!
//! A [`User`] row is read with its internal [`UserId`] so services can join
//! on it, but only the [`PublicId`] is ever serialized.

use crate::auth::MIN_PASSWORD_LENGTH;
use crate::ids::{PublicId, SchoolId, UserId};
use crate::value_types::{Email, Role};
use jifunze_core::PaginationParams;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A user account.
///
/// Managers may have no `school_id`; everyone else belongs to exactly one
/// school (enforced by the `users_school_required` check constraint).
#[derive(Serialize, FromRow, Debug, Clone, PartialEq, Eq)]
pub struct User {
    #[serde(skip)]
    pub id: UserId,
    pub public_id: PublicId,
    pub name: String,
    pub email: Email,
    pub role: Role,
    pub school_id: Option<SchoolId>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Internal view of a user including the password hash. Never serialized.
#[derive(FromRow, Debug, Clone)]
pub struct UserCredentials {
    pub id: UserId,
    pub public_id: PublicId,
    pub role: Role,
    pub school_id: Option<SchoolId>,
    pub password_hash: String,
}

/// Partial update of a user. Absent fields are left unchanged.
#[derive(Deserialize, Debug, Clone, Default, Validate)]
pub struct UpdateUserDto {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub email: Option<Email>,
    pub role: Option<Role>,
}

impl UpdateUserDto {
    /// Names of the fields present in the request, in column order.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.email.is_some() {
            fields.push("email");
        }
        if self.role.is_some() {
            fields.push("role");
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }
}

#[derive(Deserialize, Debug, Clone, Validate)]
pub struct ChangePasswordDto {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(
        min = MIN_PASSWORD_LENGTH,
        message = "Password must be at least 6 characters"
    ))]
    pub new_password: String,
}

/// Query parameters for listing users within a school.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilterParams {
    pub school_id: Option<SchoolId>,
    pub role: Option<Role>,
    pub name: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn sample_user() -> User {
        let now = chrono::Utc::now();
        User {
            id: UserId(42),
            public_id: PublicId(Uuid::nil()),
            name: "Amina".into(),
            email: Email::new("amina@example.com").unwrap(),
            role: Role::Student,
            school_id: Some(SchoolId(1)),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_internal_id_is_not_serialized() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["public_id"], Uuid::nil().to_string());
        assert_eq!(json["role"], "student");
    }

    #[test]
    fn test_changed_fields() {
        let dto: UpdateUserDto =
            serde_json::from_str(r#"{"name": "New", "role": "educator"}"#).unwrap();
        assert_eq!(dto.changed_fields(), vec!["name", "role"]);
        assert!(UpdateUserDto::default().is_empty());
    }

    #[test]
    fn test_short_new_password_rejected() {
        let dto = ChangePasswordDto {
            current_password: "secret1".into(),
            new_password: "abc".into(),
        };
        assert!(dto.validate().is_err());
    }
}
