//! Authentication request and response DTOs.
//!
//! Covers registration, login, token refresh and the two-step password reset
//! flow. Claim types live in `jifunze-auth`.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::ids::SchoolId;
use crate::users::User;
use crate::value_types::{Email, Role};

/// Minimum accepted password length for every password-setting request.
pub const MIN_PASSWORD_LENGTH: u64 = 6;

/// Self-registration request.
///
/// Students and educators must name a school; managers register without one
/// and provision schools afterwards.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub email: Email,
    pub role: Role,
    pub school_id: Option<SchoolId>,
    #[validate(length(
        min = MIN_PASSWORD_LENGTH,
        message = "Password must be at least 6 characters"
    ))]
    pub password: String,
}

/// Login request. The email is matched case-insensitively.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Successful login: a token pair and the authenticated user.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

/// Response to a refresh: a fresh token pair minted from live user data.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Step one of a password reset.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

/// Body returned for every reset request, whether or not the email exists.
///
/// `reset_token` is only populated when token exposure is switched on for
/// development and testing, and only for known emails.
#[derive(Debug, Clone, Serialize)]
pub struct ForgotPasswordResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
}

/// Step two of a password reset.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(
        min = MIN_PASSWORD_LENGTH,
        message = "Password must be at least 6 characters"
    ))]
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_lowercases_email() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"name": "Jo", "email": "Jo@Example.com", "role": "educator", "school_id": 3, "password": "secret1"}"#,
        )
        .unwrap();
        assert_eq!(req.email.as_str(), "jo@example.com");
        assert_eq!(req.school_id, Some(SchoolId(3)));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_register_rejects_unknown_role() {
        let result = serde_json::from_str::<RegisterRequest>(
            r#"{"name": "Jo", "email": "jo@example.com", "role": "admin", "password": "secret1"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_password_length_boundary() {
        let at_minimum = "x".repeat(MIN_PASSWORD_LENGTH as usize);
        let below_minimum = "x".repeat(MIN_PASSWORD_LENGTH as usize - 1);

        let reset = |password: &str| ResetPasswordRequest {
            token: "abc".into(),
            new_password: password.into(),
        };
        assert!(reset(&at_minimum).validate().is_ok());
        assert!(reset(&below_minimum).validate().is_err());

        let register = |password: &str| RegisterRequest {
            name: "Jo".into(),
            email: Email::new("jo@example.com").unwrap(),
            role: Role::Manager,
            school_id: None,
            password: password.into(),
        };
        assert!(register(&at_minimum).validate().is_ok());
        assert!(register(&below_minimum).validate().is_err());
    }

    #[test]
    fn test_generic_reset_response_has_no_token() {
        let body = serde_json::to_value(ForgotPasswordResponse { reset_token: None }).unwrap();
        assert_eq!(body, serde_json::json!({}));
    }
}
