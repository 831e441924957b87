//! # Jifunze Core
//!
//! Core types, errors, and utilities for the Jifunze API.
//!
//! This crate provides foundational types used throughout the Jifunze application:
//!
//! - [`errors`]: Application error taxonomy with HTTP response conversion
//! - [`response`]: The uniform `{success, message, errors?, data?}` envelope
//! - [`pagination`]: Limit/offset pagination for list endpoints
//! - [`password`]: Secure password hashing and verification
//!
//! # Example
//!
//! ```ignore
//! use jifunze_core::{AppError, ApiResponse};
//! use jifunze_core::password::{hash_password, verify_password};
//!
//! // Create an error
//! let error = AppError::not_found(anyhow::anyhow!("Course not found"));
//!
//! // Hash a password
//! let hash = hash_password("secure_password")?;
//!
//! // Wrap a payload
//! let response = ApiResponse::ok("Course retrieved", course);
//! ```

pub mod errors;
pub mod pagination;
pub mod password;
pub mod response;

// Re-export commonly used types at crate root
pub use errors::{AppError, ErrorKind};
pub use pagination::{Paginated, PaginationMeta, PaginationParams};
pub use password::{hash_password, verify_password};
pub use response::ApiResponse;
