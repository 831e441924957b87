//! Redis connection configuration.

use std::env;

/// Redis settings loaded from environment variables.
///
/// # Environment Variables
///
/// - `REDIS_URL`: Redis connection URL (default: `redis://127.0.0.1:6379`)
/// - `CACHE_PREFIX`: Prefix for every key written (default: `jifunze`)
#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub redis_url: String,

    /// Prefix for all keys to avoid collisions with other applications
    /// sharing the instance.
    pub key_prefix: String,
}

impl CacheConfig {
    pub fn from_env() -> Self {
        Self {
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
            key_prefix: env::var("CACHE_PREFIX").unwrap_or_else(|_| "jifunze".into()),
        }
    }

    /// Build a prefixed key, e.g. `jifunze:revoked:<jti>`.
    pub fn prefixed_key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".into(),
            key_prefix: "jifunze".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_key() {
        let config = CacheConfig {
            key_prefix: "test".into(),
            ..CacheConfig::default()
        };
        assert_eq!(config.prefixed_key("revoked:abc"), "test:revoked:abc");
    }
}
