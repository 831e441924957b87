//! Credential Store: password changes and single-use reset tokens.
//!
//! Reset tokens are 32 random bytes, URL-safe base64 encoded. Only their
//! SHA-256 digest is stored, so a leaked table cannot be replayed.
//! Consumption locks the token row and updates the password in the same
//! transaction, which makes a token usable at most once even under
//! concurrent requests.

use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use data_encoding::BASE64URL_NOPAD;
use jifunze_core::{AppError, ErrorKind, hash_password, verify_password};
use jifunze_models::{ResetTokenId, UserId};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::{debug, info, instrument, warn};

use crate::metrics;

const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ResetTokenError {
    #[error("Invalid reset token")]
    Invalid,
    #[error("Reset token has expired")]
    Expired,
    #[error("Reset token has already been used")]
    AlreadyUsed,
}

impl From<ResetTokenError> for AppError {
    fn from(err: ResetTokenError) -> Self {
        let kind = match err {
            ResetTokenError::Invalid => ErrorKind::TokenInvalid,
            ResetTokenError::Expired => ErrorKind::TokenExpired,
            ResetTokenError::AlreadyUsed => ErrorKind::TokenAlreadyUsed,
        };
        AppError::new(kind, err)
    }
}

#[derive(Debug, FromRow)]
struct ResetTokenRow {
    id: ResetTokenId,
    user_id: UserId,
    expires_at: DateTime<Utc>,
    used: bool,
}

pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    BASE64URL_NOPAD.encode(&bytes)
}

pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub struct CredentialService;

impl CredentialService {
    /// Persists a new reset token for `user_id` and returns its plaintext.
    /// Earlier tokens of the same user stay valid.
    #[instrument(skip(conn), fields(db.operation = "INSERT", db.table = "reset_tokens"))]
    pub async fn issue_reset_token(
        conn: &mut PgConnection,
        user_id: UserId,
        validity: Duration,
    ) -> Result<String, AppError> {
        let token = generate_token();
        let expires_at = Utc::now() + validity;

        sqlx::query("INSERT INTO reset_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(token_digest(&token))
            .bind(expires_at)
            .execute(&mut *conn)
            .await?;

        metrics::track_reset_token("issued");
        info!(user.id = %user_id, expires_at = %expires_at, "Reset token issued");

        Ok(token)
    }

    /// Marks the token used and sets the new password in one transaction.
    ///
    /// An expired token is deleted before `TokenExpired` is returned.
    #[instrument(skip_all, fields(db.operation = "UPDATE", db.table = "reset_tokens"))]
    pub async fn consume_reset_token(
        db: &PgPool,
        token: &str,
        new_password: &str,
    ) -> Result<UserId, AppError> {
        let mut tx = db.begin().await?;

        let row = sqlx::query_as::<_, ResetTokenRow>(
            "SELECT id, user_id, expires_at, used FROM reset_tokens
             WHERE token_hash = $1
             FOR UPDATE",
        )
        .bind(token_digest(token))
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ResetTokenError::Invalid)?;

        if Utc::now() > row.expires_at {
            sqlx::query("DELETE FROM reset_tokens WHERE id = $1")
                .bind(row.id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            metrics::track_reset_token("expired");
            debug!(token.id = %row.id, "Expired reset token removed");
            return Err(ResetTokenError::Expired.into());
        }

        if row.used {
            warn!(token.id = %row.id, "Reset token replay rejected");
            return Err(ResetTokenError::AlreadyUsed.into());
        }

        let password_hash = hash_password(new_password)?;

        sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(&password_hash)
            .bind(row.user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE reset_tokens SET used = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(row.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        metrics::track_reset_token("consumed");
        info!(user.id = %row.user_id, "Password reset completed");

        Ok(row.user_id)
    }

    /// Removes reset tokens past their expiry. Returns the number removed.
    #[instrument(skip(db), fields(db.operation = "DELETE", db.table = "reset_tokens"))]
    pub async fn purge_expired(db: &PgPool) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM reset_tokens WHERE expires_at < NOW()")
            .execute(db)
            .await?;

        info!(count = result.rows_affected(), "Expired reset tokens purged");
        Ok(result.rows_affected())
    }

    #[instrument(skip_all, fields(db.operation = "UPDATE", db.table = "users"))]
    pub async fn change_password(
        db: &PgPool,
        user_id: UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let current_hash: String =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(db)
                .await?
                .ok_or_else(|| AppError::not_found(anyhow!("User not found")))?;

        if !verify_password(current_password, &current_hash)? {
            return Err(AppError::bad_request(anyhow!("Current password is incorrect")));
        }

        let password_hash = hash_password(new_password)?;
        sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(&password_hash)
            .bind(user_id)
            .execute(db)
            .await?;

        info!(user.id = %user_id, "Password changed");
        Ok(())
    }
}
