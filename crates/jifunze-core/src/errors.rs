//! Application error type and error taxonomy.
//!
//! Every failure that reaches a client is an [`AppError`] carrying an
//! [`ErrorKind`]. The kind decides the HTTP status and the `errors.code`
//! field of the response envelope; the wrapped [`anyhow::Error`] carries the
//! human-readable message (client errors) or the logged cause (server errors).
//!
//! Storage failures are classified by [`From<sqlx::Error>`]: uniqueness and
//! foreign-key violations become `Conflict`, pool and statement timeouts become
//! the retryable `Unavailable`, anything else is `Internal` and never exposes
//! the database message.

use anyhow::{Error, anyhow};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;
use tracing::{debug, error};

/// Error categories surfaced to API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    ValidationError,
    TenantMismatch,
    Unauthenticated,
    InsufficientRole,
    CrossTenant,
    Forbidden,
    NotFound,
    Conflict,
    TokenInvalid,
    TokenExpired,
    TokenAlreadyUsed,
    Unavailable,
    Internal,
}

impl ErrorKind {
    pub const fn status(self) -> StatusCode {
        match self {
            Self::ValidationError
            | Self::TenantMismatch
            | Self::TokenInvalid
            | Self::TokenExpired
            | Self::TokenAlreadyUsed => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::InsufficientRole | Self::CrossTenant | Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Server-side kinds hide their cause from the client.
    pub const fn is_server_error(self) -> bool {
        matches!(self, Self::Unavailable | Self::Internal)
    }

    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Unavailable)
    }

    const fn public_message(self) -> &'static str {
        match self {
            Self::Unavailable => "Service temporarily unavailable, please retry",
            _ => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub kind: ErrorKind,
    pub error: Error,
    pub details: Option<Value>,
}

impl AppError {
    pub fn new<E>(kind: ErrorKind, err: E) -> Self
    where
        E: Into<Error>,
    {
        Self {
            status: kind.status(),
            kind,
            error: err.into(),
            details: None,
        }
    }

    /// Attach extra fields to the `errors` object of the response.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn internal<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(ErrorKind::Internal, err)
    }

    pub fn unavailable<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(ErrorKind::Unavailable, err)
    }

    pub fn not_found<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(ErrorKind::NotFound, err)
    }

    pub fn bad_request<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(ErrorKind::ValidationError, err)
    }

    pub fn unauthorized<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(ErrorKind::Unauthenticated, err)
    }

    pub fn forbidden<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(ErrorKind::Forbidden, err)
    }

    pub fn insufficient_role<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(ErrorKind::InsufficientRole, err)
    }

    pub fn cross_tenant<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(ErrorKind::CrossTenant, err)
    }

    pub fn conflict<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(ErrorKind::Conflict, err)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.error)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.kind.is_server_error() {
            error!(kind = %self.kind, error = ?self.error, "Request failed");
            self.kind.public_message().to_string()
        } else {
            self.error.to_string()
        };

        let mut errors = json!({ "code": self.kind });
        if self.kind.is_retryable() {
            errors["retryable"] = Value::Bool(true);
        }
        if let (Some(Value::Object(details)), Value::Object(target)) = (self.details, &mut errors)
        {
            target.extend(details);
        }

        let body = Json(json!({
            "success": false,
            "message": message,
            "errors": errors,
        }));

        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::not_found(anyhow!("Resource not found")),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::unavailable(err)
            }
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    debug!(constraint = ?db_err.constraint(), "Unique constraint violated");
                    return AppError::conflict(anyhow!("Resource already exists"));
                }
                if db_err.is_foreign_key_violation() {
                    debug!(constraint = ?db_err.constraint(), "Foreign key constraint violated");
                    return AppError::conflict(anyhow!(
                        "Resource is still referenced by other records"
                    ));
                }
                if db_err.is_check_violation() {
                    return AppError::bad_request(anyhow!("Request violates a data constraint"));
                }
                match db_err.code().as_deref() {
                    // query_canceled (statement_timeout), serialization_failure, deadlock_detected
                    Some("57014") | Some("40001") | Some("40P01") => AppError::unavailable(err),
                    _ => AppError::internal(err),
                }
            }
            _ => AppError::internal(err),
        }
    }
}
