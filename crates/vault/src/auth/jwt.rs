//! Bearer token handling.
//!
//! Tokens are HS256-signed and carry the user id and email. The identity in
//! a verified token is trusted verbatim for ownership checks.

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use keepsake_common::{KeepsakeError, Result};
use serde::{Deserialize, Serialize};

/// Minimum signing secret length
const MIN_SECRET_LEN: usize = 32;

/// Payload stored in a token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Token issuer and validator
#[derive(Clone)]
pub struct JwtService {
    secret: String,
    ttl_secs: u64,
}

impl JwtService {
    /// Returns an error if the secret is missing or too short
    pub fn new(secret: String, ttl_secs: u64) -> Result<Self> {
        if secret.is_empty() {
            return Err(KeepsakeError::Config("JWT_SECRET is required".into()));
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(KeepsakeError::Config(format!(
                "JWT_SECRET must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }
        Ok(Self { secret, ttl_secs })
    }

    pub fn issue(&self, user_id: &str, email: &str) -> Result<String> {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now,
            exp: now + self.ttl_secs,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| KeepsakeError::Internal(format!("Failed to generate token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|err| {
            use jsonwebtoken::errors::ErrorKind;
            let reason = match err.kind() {
                ErrorKind::ExpiredSignature => "Token expired",
                ErrorKind::InvalidSignature => "Invalid signature",
                _ => "Invalid token",
            };
            KeepsakeError::Unauthorized(reason.to_string())
        })
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn extract_bearer(header: Option<&str>) -> Option<&str> {
    let token = header?
        .strip_prefix(keepsake_common::constants::headers::BEARER_PREFIX)?
        .trim();
    (!token.is_empty()).then_some(token)
}
