//! # Jifunze Config
//!
//! Configuration types for the Jifunze API.
//!
//! Every structure is loaded from environment variables with a `from_env()`
//! constructor and falls back to development defaults:
//!
//! - [`jwt`]: Session token signing secret and lifetimes
//! - [`session`]: Revocation store backend selection
//! - [`reset`]: Password-reset token lifetime
//! - [`database`]: Connection pool sizing and timeouts
//! - [`cors`]: CORS (Cross-Origin Resource Sharing) configuration
//! - [`rate_limit`]: API rate limiting configuration
//!
//! # Example
//!
//! ```ignore
//! use jifunze_config::{JwtConfig, DatabaseConfig, ResetConfig};
//!
//! let jwt_config = JwtConfig::from_env();
//! let db_config = DatabaseConfig::from_env();
//! let reset_config = ResetConfig::from_env();
//! ```

pub mod cors;
pub mod database;
pub mod jwt;
pub mod rate_limit;
pub mod reset;
pub mod session;

// Re-export commonly used types at crate root
pub use cors::CorsConfig;
pub use database::DatabaseConfig;
pub use jwt::JwtConfig;
pub use rate_limit::RateLimitConfig;
pub use reset::ResetConfig;
pub use session::{RevocationBackend, SessionConfig};

pub(crate) fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

pub(crate) fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(default)
}
