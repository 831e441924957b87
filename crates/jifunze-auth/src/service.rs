//! Token Service: issues, authenticates, and revokes session tokens.

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use chrono::Utc;
use jifunze_config::JwtConfig;
use jifunze_core::AppError;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::claims::{Claims, Identity, TokenType};
use crate::jwt::{build_claims, decode_token, encode_token};
use crate::revocation::{InMemoryRevocationStore, RevocationStore};

/// A freshly minted access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_claims: Claims,
}

#[derive(Clone)]
pub struct TokenService {
    config: JwtConfig,
    store: Arc<dyn RevocationStore>,
}

impl TokenService {
    pub fn new(config: JwtConfig, store: Arc<dyn RevocationStore>) -> Self {
        Self { config, store }
    }

    /// Single-process service backed by an [`InMemoryRevocationStore`].
    pub fn in_memory(config: JwtConfig) -> Self {
        Self::new(config, Arc::new(InMemoryRevocationStore::new()))
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Mints an access and a refresh token for `identity` in a new session.
    pub fn issue(&self, identity: &Identity) -> Result<TokenPair, AppError> {
        self.issue_in_session(identity, Uuid::new_v4())
    }

    /// Mints a pair that continues session `sid`, as a refresh does.
    pub fn issue_in_session(&self, identity: &Identity, sid: Uuid) -> Result<TokenPair, AppError> {
        let access_claims = build_claims(identity, TokenType::Access, sid, &self.config);
        let refresh_claims = build_claims(identity, TokenType::Refresh, sid, &self.config);

        Ok(TokenPair {
            access_token: encode_token(&access_claims, &self.config)?,
            refresh_token: encode_token(&refresh_claims, &self.config)?,
            access_claims,
        })
    }

    /// Validates an access token: signature, expiry, type and revocation.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, token: &str) -> Result<Claims, AppError> {
        self.verify(token, TokenType::Access).await
    }

    /// Validates a refresh token the same way [`authenticate`](Self::authenticate)
    /// validates access tokens.
    #[instrument(skip_all)]
    pub async fn verify_refresh(&self, token: &str) -> Result<Claims, AppError> {
        self.verify(token, TokenType::Refresh).await
    }

    /// Revokes the token described by `claims` until it expires.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` if the token was already revoked, `Unavailable` if
    /// the store cannot be reached.
    #[instrument(skip_all, fields(jti = %claims.jti))]
    pub async fn revoke(&self, claims: &Claims) -> Result<(), AppError> {
        let ttl = Duration::from_secs(claims.remaining_lifetime(Utc::now().timestamp()));
        if !self.store.revoke(claims.jti, ttl).await? {
            debug!("Token already revoked");
            return Err(AppError::unauthorized(anyhow!("Token has been revoked")));
        }
        Ok(())
    }

    /// Revokes every token of the session in `claims`, including refresh
    /// tokens that were never presented. The entry outlives any refresh
    /// token the session can still hold.
    #[instrument(skip_all, fields(sid = %claims.sid))]
    pub async fn revoke_session(&self, claims: &Claims) -> Result<(), AppError> {
        let ttl = Duration::from_secs(self.config.refresh_token_expiry.max(1) as u64);
        if !self.store.revoke(claims.sid, ttl).await? {
            debug!("Session already revoked");
        }
        Ok(())
    }

    async fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, AppError> {
        let claims = decode_token(token, &self.config)?;

        if claims.token_type != expected {
            return Err(AppError::unauthorized(anyhow!("Invalid token type")));
        }
        if self.store.is_revoked(claims.jti).await? {
            return Err(AppError::unauthorized(anyhow!("Token has been revoked")));
        }
        if self.store.is_revoked(claims.sid).await? {
            return Err(AppError::unauthorized(anyhow!("Session has ended")));
        }

        Ok(claims)
    }
}
