//! Account and housekeeping commands that bypass the HTTP API.

use anyhow::{Context, anyhow, bail};
use jifunze::modules::auth::credentials::CredentialService;
use jifunze_core::hash_password;
use jifunze_models::auth::MIN_PASSWORD_LENGTH;
use jifunze_models::{Email, PublicId, Role};
use sqlx::PgPool;

/// Checks a password against the same minimum the API enforces.
pub fn validate_password(password: &str) -> anyhow::Result<()> {
    if (password.chars().count() as u64) < MIN_PASSWORD_LENGTH {
        bail!("Password must be at least {MIN_PASSWORD_LENGTH} characters");
    }
    Ok(())
}

/// Creates a manager account without a school. The manager provisions
/// schools afterwards through the API.
pub async fn create_manager(
    db: &PgPool,
    name: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<PublicId> {
    let name = name.trim();
    if name.is_empty() {
        bail!("Name cannot be empty");
    }
    let email = Email::new(email).map_err(|e| anyhow!("{e}"))?;
    validate_password(password)?;

    let password_hash =
        hash_password(password).map_err(|e| anyhow!("Failed to hash password: {e}"))?;

    let public_id = sqlx::query_scalar::<_, PublicId>(
        "INSERT INTO users (name, email, password_hash, role, school_id)
         VALUES ($1, $2, $3, $4, NULL)
         ON CONFLICT DO NOTHING
         RETURNING public_id",
    )
    .bind(name)
    .bind(&email)
    .bind(&password_hash)
    .bind(Role::Manager)
    .fetch_optional(db)
    .await
    .context("Failed to insert manager")?;

    public_id.ok_or_else(|| anyhow!("A user with email {} already exists", email.as_str()))
}

/// Deletes reset tokens past their expiry, returning how many were removed.
pub async fn purge_reset_tokens(db: &PgPool) -> anyhow::Result<u64> {
    CredentialService::purge_expired(db)
        .await
        .map_err(|e| anyhow!("Failed to purge reset tokens: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_passwords_rejected() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }
}
