//! Bearer token module.
//!
//! Handles token generation and validation. Tokens are HS256-signed JWTs
//! carrying the user's identity, role, and the session token current at
//! issuance; rotating the stored session token is what revokes outstanding
//! tokens on the strict validation path.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use hive_core::{User, UserRole};

/// Bearer token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Email at issuance
    pub email: String,

    /// Role at issuance
    pub role: UserRole,

    /// The user's session token at issuance.
    ///
    /// Compared against the stored value on the strict path; a password
    /// change rotates the stored value and orphans this claim.
    pub session_token: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// Token ID (unique per issued token)
    pub jti: String,
}

/// Bearer token manager.
pub struct TokenManager {
    secret: String,
    lifetime_secs: i64,
}

impl TokenManager {
    /// Create a new token manager.
    pub fn new(secret: String, lifetime_secs: i64) -> Self {
        TokenManager {
            secret,
            lifetime_secs,
        }
    }

    /// Issue a bearer token for a user and the session token to embed.
    pub fn issue(&self, user: &User, session_token: &str) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            session_token: session_token.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("Failed to generate token: {e}")))
    }

    /// Validate signature and expiry, returning the claims.
    ///
    /// Distinguishes an expired token from every other decode failure so the
    /// client can prompt for re-login instead of treating it as an attack.
    pub fn validate(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => ApiError::TokenExpired,
            _ => ApiError::TokenInvalid,
        })?;

        Ok(token_data.claims)
    }

    /// Seconds until a token expires.
    pub fn remaining_lifetime(&self, token: &str) -> Result<i64, ApiError> {
        let claims = self.validate(token)?;
        Ok(claims.exp - Utc::now().timestamp())
    }

    /// Configured token lifetime, for `expires_at` response fields.
    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }
}

/// Extract the bearer token from an Authorization header value.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

// =============================================================================
// Unit Tests
// =============================================================================
