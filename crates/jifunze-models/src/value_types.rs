//! Strongly-typed value types with validation for domain primitives.
//!
//! - [`Email`]: a validated, lower-cased email address. Lower-casing on
//!   construction makes every comparison case-insensitive.
//! - [`Role`]: the fixed set of account roles.
//! - [`AttendanceStatus`]: the outcome recorded for an attendance entry.
//!
//! All three are stored as `TEXT` columns.
//!
//! # Example
//!
//! ```ignore
//! use jifunze_models::value_types::{Email, Role};
//!
//! let email: Email = "Jane.Doe@Example.com".parse().unwrap();
//! assert_eq!(email.as_str(), "jane.doe@example.com");
//!
//! let role: Role = "educator".parse().unwrap();
//! assert!(role.is_staff());
//! ```

use serde::{Deserialize, Serialize};
use sqlx::{
    Database, Decode, Encode, Type,
    postgres::{PgHasArrayType, PgTypeInfo},
};
use std::fmt;
use std::str::FromStr;
use validator::ValidateEmail;

/// Error type for value type parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueTypeError {
    #[error("Invalid email: {0}")]
    InvalidEmail(String),
    #[error("Invalid role: '{0}' (expected student, educator or manager)")]
    InvalidRole(String),
    #[error("Invalid attendance status: '{0}' (expected present, absent or late)")]
    InvalidAttendanceStatus(String),
}

/// Implements the Postgres `TEXT` mapping through `as_str`/`FromStr`.
macro_rules! impl_text_column {
    ($name:ident) => {
        impl Type<sqlx::Postgres> for $name {
            fn type_info() -> PgTypeInfo {
                <String as Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <String as Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'q> Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut <sqlx::Postgres as Database>::ArgumentBuffer<'q>,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <&str as Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }

        impl<'r> Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: <sqlx::Postgres as Database>::ValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as Decode<'r, sqlx::Postgres>>::decode(value)?;
                Ok(Self::from_column(s)?)
            }
        }

        impl PgHasArrayType for $name {
            fn array_type_info() -> PgTypeInfo {
                <String as PgHasArrayType>::array_type_info()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// ============================================================================
// Email
// ============================================================================

#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Email(String);

impl Email {
    /// Validates and lower-cases `email`.
    pub fn new(email: impl AsRef<str>) -> Result<Self, ValueTypeError> {
        let email = email.as_ref().trim().to_lowercase();
        if email.is_empty() {
            return Err(ValueTypeError::InvalidEmail("email cannot be empty".into()));
        }
        if !email.validate_email() {
            return Err(ValueTypeError::InvalidEmail(format!(
                "'{}' is not a valid email address",
                email
            )));
        }
        Ok(Self(email))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }

    // Stored values were validated on the way in.
    fn from_column(s: &str) -> Result<Self, ValueTypeError> {
        Ok(Self(s.to_string()))
    }
}

impl fmt::Debug for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Email({})", self.0)
    }
}

impl FromStr for Email {
    type Err = ValueTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Email {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Email {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl_text_column!(Email);

// ============================================================================
// Role
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Educator,
    Manager,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Student, Role::Educator, Role::Manager];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Educator => "educator",
            Self::Manager => "manager",
        }
    }

    /// Educators and managers.
    pub const fn is_staff(&self) -> bool {
        matches!(self, Self::Educator | Self::Manager)
    }

    fn from_column(s: &str) -> Result<Self, ValueTypeError> {
        s.parse()
    }
}

impl FromStr for Role {
    type Err = ValueTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "educator" => Ok(Self::Educator),
            "manager" => Ok(Self::Manager),
            other => Err(ValueTypeError::InvalidRole(other.to_string())),
        }
    }
}

impl_text_column!(Role);

// ============================================================================
// AttendanceStatus
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

impl AttendanceStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Late => "late",
        }
    }

    fn from_column(s: &str) -> Result<Self, ValueTypeError> {
        s.parse()
    }
}

impl FromStr for AttendanceStatus {
    type Err = ValueTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(Self::Present),
            "absent" => Ok(Self::Absent),
            "late" => Ok(Self::Late),
            other => Err(ValueTypeError::InvalidAttendanceStatus(other.to_string())),
        }
    }
}

impl_text_column!(AttendanceStatus);
