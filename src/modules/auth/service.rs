use anyhow::anyhow;
use chrono::Duration;
use jifunze_auth::{Claims, Identity, TokenService};
use jifunze_config::ResetConfig;
use jifunze_core::{AppError, hash_password, verify_password};
use jifunze_models::{
    ForgotPasswordResponse, LoginRequest, LoginResponse, PublicId, RegisterRequest, Role,
    TokenPairResponse, User, UserCredentials, UserId,
};
use sqlx::PgPool;
use tracing::{debug, error, info, instrument, warn};

use crate::metrics;
use crate::modules::auth::credentials::CredentialService;
use crate::modules::users::service::{USER_COLUMNS, UserService};

pub struct AuthService;

impl AuthService {
    #[instrument(skip(db, dto), fields(user.role = %dto.role, db.operation = "INSERT", db.table = "users"))]
    pub async fn register_user(db: &PgPool, dto: RegisterRequest) -> Result<User, AppError> {
        match (dto.role, dto.school_id) {
            (Role::Manager, Some(_)) => {
                return Err(AppError::bad_request(anyhow!(
                    "Managers register without a school and create their own"
                )));
            }
            (Role::Student | Role::Educator, None) => {
                return Err(AppError::bad_request(anyhow!(
                    "school_id is required for students and educators"
                )));
            }
            _ => {}
        }

        if let Some(school_id) = dto.school_id {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM schools WHERE id = $1)")
                .bind(school_id)
                .fetch_one(db)
                .await?;
            if !exists {
                return Err(AppError::bad_request(anyhow!("School does not exist")));
            }
        }

        let password_hash = hash_password(&dto.password)?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (public_id, name, email, password_hash, role, school_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(PublicId::new())
        .bind(&dto.name)
        .bind(&dto.email)
        .bind(&password_hash)
        .bind(dto.role)
        .bind(dto.school_id)
        .fetch_one(db)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error registering user");
            map_email_conflict(e)
        })?;

        metrics::track_user_registered(user.role.as_str());
        info!(user.public_id = %user.public_id, user.role = %user.role, "User registered");

        Ok(user)
    }

    #[instrument(skip(db, tokens, dto), fields(db.operation = "SELECT", db.table = "users"))]
    pub async fn login_user(
        db: &PgPool,
        tokens: &TokenService,
        dto: LoginRequest,
    ) -> Result<LoginResponse, AppError> {
        debug!("Login attempt");

        let credentials = sqlx::query_as::<_, UserCredentials>(
            "SELECT id, public_id, role, school_id, password_hash
             FROM users WHERE lower(email) = lower($1)",
        )
        .bind(dto.email.trim())
        .fetch_optional(db)
        .await?;

        let Some(credentials) = credentials else {
            metrics::track_user_login_failure("unknown_email");
            return Err(AppError::unauthorized(anyhow!("Invalid email or password")));
        };

        if !verify_password(&dto.password, &credentials.password_hash)? {
            metrics::track_user_login_failure("wrong_password");
            warn!(user.public_id = %credentials.public_id, "Login with wrong password");
            return Err(AppError::unauthorized(anyhow!("Invalid email or password")));
        }

        let user = UserService::find_by_id(db, credentials.id).await?;
        let pair = tokens.issue(&Identity::from(&user))?;

        metrics::track_user_login_success(user.role.as_str());
        metrics::track_tokens_issued();
        info!(user.public_id = %user.public_id, "User logged in");

        Ok(LoginResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            user,
        })
    }

    /// Spends `claims` and mints a new pair from the user's current row.
    #[instrument(skip_all, fields(user.public_id = %claims.sub, db.operation = "SELECT", db.table = "users"))]
    pub async fn refresh_tokens(
        db: &PgPool,
        tokens: &TokenService,
        claims: Claims,
    ) -> Result<TokenPairResponse, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE public_id = $1"
        ))
        .bind(claims.sub)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::unauthorized(anyhow!("Account no longer exists")))?;

        tokens.revoke(&claims).await?;
        metrics::track_token_revoked("refresh");

        let pair = tokens.issue_in_session(&Identity::from(&user), claims.sid)?;
        metrics::track_tokens_issued();

        if user.role != claims.role || user.school_id != claims.school_id {
            info!(
                old.role = %claims.role,
                new.role = %user.role,
                "Refreshed claims differ from the previous token"
            );
        }

        Ok(TokenPairResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        })
    }

    /// Ends the session: the access token and every refresh token minted
    /// alongside it stop working.
    #[instrument(skip_all, fields(user.public_id = %claims.sub))]
    pub async fn logout(tokens: &TokenService, claims: &Claims) -> Result<(), AppError> {
        tokens.revoke(claims).await?;
        tokens.revoke_session(claims).await?;
        metrics::track_token_revoked("logout");
        info!("User logged out");
        Ok(())
    }

    /// Issues a reset token when `email` belongs to an account.
    ///
    /// Callers get the same response either way; the token is only returned
    /// when `config.expose_token` is set.
    #[instrument(skip_all, fields(db.operation = "INSERT", db.table = "reset_tokens"))]
    pub async fn request_password_reset(
        db: &PgPool,
        config: &ResetConfig,
        email: &str,
    ) -> Result<ForgotPasswordResponse, AppError> {
        let mut tx = db.begin().await?;

        let user_id: Option<UserId> =
            sqlx::query_scalar("SELECT id FROM users WHERE lower(email) = lower($1)")
                .bind(email.trim())
                .fetch_optional(&mut *tx)
                .await?;

        let Some(user_id) = user_id else {
            debug!("Password reset requested for an unknown email");
            return Ok(ForgotPasswordResponse { reset_token: None });
        };

        let token = CredentialService::issue_reset_token(
            &mut *tx,
            user_id,
            Duration::hours(config.token_ttl_hours),
        )
        .await?;
        tx.commit().await?;

        Ok(ForgotPasswordResponse {
            reset_token: config.expose_token.then_some(token),
        })
    }

    pub async fn reset_password(db: &PgPool, token: &str, new_password: &str) -> Result<(), AppError> {
        CredentialService::consume_reset_token(db, token, new_password).await?;
        Ok(())
    }
}

/// Turns a hit on the case-insensitive email index into `Conflict`.
pub(crate) fn map_email_conflict(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.constraint() == Some("users_email_lower_key")
    {
        return AppError::conflict(anyhow!("Email already registered"));
    }
    AppError::from(err)
}
