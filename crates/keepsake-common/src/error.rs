//! Common error types for Keepsake components.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Common errors across Keepsake components
#[derive(Debug, Error)]
pub enum KeepsakeError {
    /// No such capsule
    #[error("Capsule not found")]
    NotFound,

    /// Capsule belongs to another user
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Missing or invalid input
    #[error("Invalid input: {0}")]
    BadRequest(String),

    /// Missing or invalid bearer credential
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Unlock attempted before the capsule's unlock date
    #[error("Capsule cannot be unlocked yet ({days_left} days left)")]
    NotYetEligible {
        unlock_date: DateTime<Utc>,
        days_left: i64,
    },

    /// Content validator refused the submission
    #[error("Content rejected: {0}")]
    ContentRejected(String),

    /// Judgment oracle failed, timed out, or returned unparseable data
    #[error("Oracle failure: {0}")]
    OracleFailure(String),

    /// Duplicate registration
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Too many unlock attempts in the current window
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Backing store connection/operation error
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl KeepsakeError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::Forbidden(_) => 403,
            Self::BadRequest(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::NotYetEligible { .. } => 400,
            Self::ContentRejected(_) => 422,
            Self::OracleFailure(_) => 502,
            Self::Conflict(_) => 409,
            Self::RateLimited(_) => 429,
            Self::Store(_) => 503,
            Self::Config(_) => 500,
            Self::Internal(_) => 500,
        }
    }

    /// Returns true if this error should be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::OracleFailure(_) | Self::Store(_))
    }

    /// Server-side failures whose detail must not reach the client
    pub fn is_internal(&self) -> bool {
        self.status_code() >= 500
    }
}

impl From<serde_json::Error> for KeepsakeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {}", err))
    }
}
