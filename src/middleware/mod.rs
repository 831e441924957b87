//! Extractors for request authentication.
//!
//! # Authentication Flow
//!
//! 1. Client sends request with `Authorization: Bearer <token>` header
//! 2. [`auth::AuthUser`] validates the token with the Token Service, including
//!    the revocation check, and extracts claims
//! 3. The service layer loads the target's tenant facts and asks the Scope
//!    Resolver for a decision inside its transaction
//!
//! # Example
//!
//! ```ignore
//! use crate::middleware::auth::AuthUser;
//!
//! async fn get_profile(auth_user: AuthUser) -> impl IntoResponse {
//!     let public_id = auth_user.public_id();
//!     // ...
//! }
//! ```

pub mod auth;
