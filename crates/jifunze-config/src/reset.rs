use crate::{env_flag, env_or};

/// Password-reset token settings.
///
/// `RESET_EXPOSE_TOKEN` returns the raw token in the reset-request response.
/// It exists for test environments where no mail transport is configured and
/// must stay off in production.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResetConfig {
    pub token_ttl_hours: i64,
    pub expose_token: bool,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            token_ttl_hours: 24,
            expose_token: false,
        }
    }
}

impl ResetConfig {
    pub fn from_env() -> Self {
        Self {
            token_ttl_hours: env_or("RESET_TOKEN_TTL_HOURS", 24),
            expose_token: env_flag("RESET_EXPOSE_TOKEN", false),
        }
    }
}
