//! # Jifunze Auth
//!
//! Session tokens and authorization rules for the Jifunze API.
//!
//! - [`claims`]: JWT claim layout shared by access and refresh tokens
//! - [`jwt`]: encoding and signature/expiry verification
//! - [`revocation`]: the [`RevocationStore`] trait and an in-memory store
//! - [`service`]: the [`TokenService`] tying the above together
//! - [`scope`]: the Scope Resolver ([`authorize`])
//! - [`fields`]: field-level write permissions for partial updates
//!
//! # Example
//!
//! ```ignore
//! use jifunze_auth::{Action, Target, TokenService, require};
//! use jifunze_config::JwtConfig;
//!
//! let tokens = TokenService::in_memory(JwtConfig::from_env());
//! let pair = tokens.issue(&identity)?;
//!
//! let claims = tokens.authenticate(&pair.access_token).await?;
//! require(Some(&claims), Action::CourseCreate, &Target::school(school_id, owner))?;
//! ```

pub mod claims;
pub mod fields;
pub mod jwt;
pub mod revocation;
pub mod scope;
pub mod service;

pub use claims::{Claims, Identity, TokenType};
pub use fields::check_fields;
pub use revocation::{InMemoryRevocationStore, RevocationError, RevocationStore};
pub use scope::{Action, Decision, DenyReason, Target, authorize, require};
pub use service::{TokenPair, TokenService};
