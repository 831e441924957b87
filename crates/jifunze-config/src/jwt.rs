use std::env;

use crate::env_or;

/// Signing secret and token lifetimes (seconds).
///
/// - `JWT_SECRET`
/// - `JWT_ACCESS_EXPIRY`: default 3600 (1 hour)
/// - `JWT_REFRESH_EXPIRY`: default 2592000 (30 days)
#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry: i64,
    pub refresh_token_expiry: i64,
}

impl JwtConfig {
    pub fn from_env() -> Self {
        Self {
            secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "your-secret-key-change-in-production".to_string()),
            access_token_expiry: env_or("JWT_ACCESS_EXPIRY", 3600),
            refresh_token_expiry: env_or("JWT_REFRESH_EXPIRY", 30 * 24 * 3600),
        }
    }
}
