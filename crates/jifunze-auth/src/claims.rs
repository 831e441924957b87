//! JWT claim structures for session tokens.
//!
//! Access and refresh tokens share one claim layout and are told apart by
//! the `type` claim. Both tokens of a pair carry the same `sid`:
//!
//! ```json
//! {"sub": "<public id>", "role": "educator", "school_id": 3,
//!  "jti": "<uuid>", "sid": "<uuid>", "type": "access",
//!  "exp": 1700003600, "iat": 1700000000}
//! ```

use jifunze_models::{PublicId, Role, SchoolId, User};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims carried by every session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Public id of the user (subject claim)
    pub sub: PublicId,
    pub role: Role,
    /// Tenant of the user; `None` for managers without a school
    pub school_id: Option<SchoolId>,
    /// Unique token id, the key of the revocation set
    pub jti: Uuid,
    /// Session id shared by an access token and the refresh token minted
    /// with it
    pub sid: Uuid,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Expiration (Unix seconds)
    pub exp: i64,
    /// Issued at (Unix seconds)
    pub iat: i64,
}

impl Claims {
    /// Seconds until expiry, never less than one.
    pub fn remaining_lifetime(&self, now: i64) -> u64 {
        (self.exp - now).max(1) as u64
    }

    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }

    pub fn identity(&self) -> Identity {
        Identity {
            public_id: self.sub,
            role: self.role,
            school_id: self.school_id,
        }
    }
}

/// The live facts a token is minted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub public_id: PublicId,
    pub role: Role,
    pub school_id: Option<SchoolId>,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            public_id: user.public_id,
            role: user.role,
            school_id: user.school_id,
        }
    }
}
