use anyhow::anyhow;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jifunze_auth::Claims;
use jifunze_core::AppError;
use jifunze_models::{PublicId, Role, SchoolId};

use crate::state::AppState;

async fn bearer_token(parts: &mut Parts, state: &AppState) -> Result<String, AppError> {
    let TypedHeader(Authorization(bearer)) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                if rejection.is_missing() {
                    AppError::unauthorized(anyhow!("Missing authorization header"))
                } else {
                    AppError::unauthorized(anyhow!("Invalid authorization header format"))
                }
            })?;

    Ok(bearer.token().to_string())
}

/// Extractor that validates a bearer access token and provides its claims.
///
/// Signature, expiry, token type and revocation are all checked here, so
/// handlers only ever see claims that are valid right now.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn public_id(&self) -> PublicId {
        self.0.sub
    }

    pub fn role(&self) -> Role {
        self.0.role
    }

    /// `None` for managers
    pub fn school_id(&self) -> Option<SchoolId> {
        self.0.school_id
    }

    pub fn claims(&self) -> &Claims {
        &self.0
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts, state).await?;
        let claims = state.tokens.authenticate(&token).await?;

        Ok(AuthUser(claims))
    }
}

/// Like [`AuthUser`] for public routes: no header means anonymous, but a
/// header that is present must be valid.
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<Claims>);

impl FromRequestParts<AppState> for OptionalAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(header::AUTHORIZATION) {
            return Ok(OptionalAuthUser(None));
        }

        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;
        Ok(OptionalAuthUser(Some(claims)))
    }
}

/// Claims of a bearer refresh token. Only the refresh endpoint accepts it.
#[derive(Debug, Clone)]
pub struct RefreshClaims(pub Claims);

impl FromRequestParts<AppState> for RefreshClaims {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts, state).await?;
        let claims = state.tokens.verify_refresh(&token).await?;

        Ok(RefreshClaims(claims))
    }
}
