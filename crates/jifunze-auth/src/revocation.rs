//! Revoked token ids.
//!
//! A [`RevocationStore`] records the `jti` of every logged-out access token
//! and every spent refresh token until the token would have expired anyway.
//! [`InMemoryRevocationStore`] is correct for a single server process only;
//! multi-instance deployments use the Redis store from `jifunze-cache`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jifunze_core::AppError;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum RevocationError {
    #[error("revocation store unavailable: {0}")]
    Unavailable(String),
}

impl From<RevocationError> for AppError {
    fn from(err: RevocationError) -> Self {
        AppError::unavailable(err)
    }
}

#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Marks `jti` revoked for `ttl`.
    ///
    /// Returns `false` if it was already revoked, which lets a caller spend a
    /// token exactly once.
    async fn revoke(&self, jti: Uuid, ttl: Duration) -> Result<bool, RevocationError>;

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, RevocationError>;
}

#[derive(Debug, Default)]
pub struct InMemoryRevocationStore {
    revoked: RwLock<HashMap<Uuid, Instant>>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.revoked
            .read()
            .await
            .values()
            .filter(|expiry| **expiry > now)
            .count()
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn revoke(&self, jti: Uuid, ttl: Duration) -> Result<bool, RevocationError> {
        let now = Instant::now();
        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, expiry| *expiry > now);

        if revoked.contains_key(&jti) {
            return Ok(false);
        }
        revoked.insert(jti, now + ttl);
        Ok(true)
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, RevocationError> {
        let revoked = self.revoked.read().await;
        Ok(revoked
            .get(&jti)
            .is_some_and(|expiry| *expiry > Instant::now()))
    }
}
