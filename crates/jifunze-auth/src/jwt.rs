//! JWT encoding and decoding.
//!
//! Tokens are HS256 with the configured secret. Decoding checks the
//! signature and `exp`; the token type and revocation are checked by
//! [`TokenService`](crate::TokenService).

use anyhow::anyhow;
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use jifunze_config::JwtConfig;
use jifunze_core::AppError;

use crate::claims::{Claims, Identity, TokenType};

/// Builds claims of `token_type` for `identity` in session `sid`, with a
/// fresh `jti`.
pub fn build_claims(
    identity: &Identity,
    token_type: TokenType,
    sid: Uuid,
    jwt_config: &JwtConfig,
) -> Claims {
    let now = Utc::now().timestamp();
    let lifetime = match token_type {
        TokenType::Access => jwt_config.access_token_expiry,
        TokenType::Refresh => jwt_config.refresh_token_expiry,
    };

    Claims {
        sub: identity.public_id,
        role: identity.role,
        school_id: identity.school_id,
        jti: Uuid::new_v4(),
        sid,
        token_type,
        exp: now + lifetime,
        iat: now,
    }
}

pub fn encode_token(claims: &Claims, jwt_config: &JwtConfig) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(anyhow!("Failed to create token: {}", e)))
}

/// Verifies the signature and expiry of `token`.
///
/// # Errors
///
/// Returns `Unauthenticated` when the token is malformed, signed with
/// another key, or expired.
pub fn decode_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    let mut validation = Validation::default();
    validation.leeway = 0;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized(anyhow!("Invalid or expired token")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jifunze_core::ErrorKind;
    use jifunze_models::{PublicId, Role, SchoolId};

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 2_592_000,
        }
    }

    fn identity() -> Identity {
        Identity {
            public_id: PublicId::new(),
            role: Role::Student,
            school_id: Some(SchoolId(9)),
        }
    }

    #[test]
    fn test_encode_decode() {
        let config = config();
        let claims = build_claims(&identity(), TokenType::Access, Uuid::new_v4(), &config);
        let token = encode_token(&claims, &config).unwrap();
        assert_eq!(decode_token(&token, &config).unwrap(), claims);
    }

    #[test]
    fn test_refresh_outlives_access() {
        let config = config();
        let access = build_claims(&identity(), TokenType::Access, Uuid::new_v4(), &config);
        let refresh = build_claims(&identity(), TokenType::Refresh, Uuid::new_v4(), &config);
        assert_eq!(access.exp - access.iat, 3600);
        assert!(refresh.exp > access.exp);
        assert_ne!(access.jti, refresh.jti);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let config = config();
        let token = encode_token(&build_claims(&identity(), TokenType::Access, Uuid::new_v4(), &config), &config)
            .unwrap();
        let other = JwtConfig {
            secret: "different-secret-key-at-least-32-characters".to_string(),
            ..config
        };
        let err = decode_token(&token, &other).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthenticated);
    }

    #[test]
    fn test_expired_token_rejected() {
        let config = config();
        let mut claims = build_claims(&identity(), TokenType::Access, Uuid::new_v4(), &config);
        claims.iat -= 7200;
        claims.exp = claims.iat + 60;
        let token = encode_token(&claims, &config).unwrap();
        assert!(decode_token(&token, &config).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(decode_token("invalid-token", &config()).is_err());
    }
}
