//! Authenticated identity extractor.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use keepsake_common::KeepsakeError;

use super::extract_bearer;
use crate::error::ApiError;
use crate::state::AppState;

/// Identity of the caller, taken from a verified bearer token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let token = extract_bearer(header).ok_or_else(|| {
            KeepsakeError::Unauthorized("No authentication token, access denied".to_string())
        })?;

        let claims = state.jwt.verify(token)?;
        Ok(Self {
            user_id: claims.sub,
            email: claims.email,
        })
    }
}
