//! Revocation set shared by every server instance through Redis.
//!
//! Each revoked `jti` is a key that expires together with the token, so the
//! set never grows beyond the tokens still alive.

use std::time::Duration;

use async_trait::async_trait;
use jifunze_auth::{RevocationError, RevocationStore};
use tracing::warn;
use uuid::Uuid;

use crate::config::CacheConfig;
use crate::redis::{CacheError, RedisCache};

#[derive(Debug, Clone)]
pub struct RedisRevocationStore {
    cache: RedisCache,
    config: CacheConfig,
}

impl RedisRevocationStore {
    pub fn new(cache: RedisCache, config: CacheConfig) -> Self {
        Self { cache, config }
    }

    pub async fn connect(config: CacheConfig) -> Result<Self, CacheError> {
        let cache = RedisCache::new(&config.redis_url).await?;
        Ok(Self::new(cache, config))
    }

    fn key(&self, jti: Uuid) -> String {
        revoked_key(&self.config, jti)
    }
}

fn revoked_key(config: &CacheConfig, jti: Uuid) -> String {
    config.prefixed_key(&format!("revoked:{}", jti))
}

fn unavailable(err: CacheError) -> RevocationError {
    warn!(error = %err, "Revocation store unreachable");
    RevocationError::Unavailable(err.to_string())
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn revoke(&self, jti: Uuid, ttl: Duration) -> Result<bool, RevocationError> {
        self.cache
            .set_if_absent(&self.key(jti), "1", ttl)
            .await
            .map_err(unavailable)
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, RevocationError> {
        self.cache.exists(&self.key(jti)).await.map_err(unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let jti = Uuid::nil();
        assert_eq!(
            revoked_key(&CacheConfig::default(), jti),
            format!("jifunze:revoked:{}", jti)
        );
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_revoke_round_trip() {
        let store = RedisRevocationStore::connect(CacheConfig {
            key_prefix: "jifunze-test".into(),
            ..CacheConfig::default()
        })
        .await
        .unwrap();
        let jti = Uuid::new_v4();

        assert!(!store.is_revoked(jti).await.unwrap());
        assert!(store.revoke(jti, Duration::from_secs(5)).await.unwrap());
        assert!(!store.revoke(jti, Duration::from_secs(5)).await.unwrap());
        assert!(store.is_revoked(jti).await.unwrap());
    }
}
