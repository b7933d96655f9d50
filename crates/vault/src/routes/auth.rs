//! Registration, login, and current-user endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use keepsake_common::constants::MIN_PASSWORD_CHARS;
use keepsake_common::{KeepsakeError, UserProfile, UserRecord, UserView};

use crate::auth::{AuthUser, hash_password, verify_password};
use crate::engine::generate_id;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::normalize_email;

#[derive(Deserialize)]
pub struct Credentials {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
pub struct AccountSummary {
    id: String,
    email: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    message: &'static str,
    token: String,
    user: AccountSummary,
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Hashing is CPU-bound; keep it off the async workers
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> keepsake_common::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| KeepsakeError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(ApiError::from)
}

/// Register a new account
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<Credentials>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let email = normalize_email(&payload.email);
    if !looks_like_email(&email) {
        return Err(KeepsakeError::BadRequest("Please provide a valid email".to_string()).into());
    }
    if payload.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(KeepsakeError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_CHARS
        ))
        .into());
    }

    let password = payload.password;
    let password_hash = blocking(move || hash_password(&password)).await?;

    let user = UserRecord {
        id: generate_id(),
        email,
        password_hash,
        profile: UserProfile::default(),
        created_at: Utc::now(),
        version: 0,
    };
    state.users.create(&user).await?;

    let token = state.jwt.issue(&user.id, &user.email)?;
    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully",
            token,
            user: AccountSummary {
                id: user.id,
                email: user.email,
            },
        }),
    ))
}

/// Exchange credentials for a token
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<Credentials>,
) -> Result<Json<AuthResponse>, ApiError> {
    let invalid = || ApiError::from(KeepsakeError::BadRequest("Invalid credentials".to_string()));

    let Some(user) = state.users.get_by_email(&payload.email).await? else {
        return Err(invalid());
    };

    let password = payload.password;
    let hash = user.password_hash.clone();
    if !blocking(move || verify_password(&password, &hash)).await? {
        tracing::debug!(user_id = %user.id, "Login rejected");
        return Err(invalid());
    }

    let token = state.jwt.issue(&user.id, &user.email)?;
    Ok(Json(AuthResponse {
        message: "Login successful",
        token,
        user: AccountSummary {
            id: user.id,
            email: user.email,
        },
    }))
}

/// Current user's account and progression
pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserView>, ApiError> {
    let user = state
        .users
        .get_by_id(&auth.user_id)
        .await?
        .ok_or_else(|| KeepsakeError::Unauthorized("Account no longer exists".to_string()))?;
    tracing::debug!(user_id = %auth.user_id, email = %auth.email, "Profile requested");
    Ok(Json(user.view()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_shape() {
        assert!(looks_like_email("ada@example.com"));
        assert!(!looks_like_email("ada"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("ada@localhost"));
        assert!(!looks_like_email("ada@example."));
    }
}
