//! Capsule endpoints: create, list, view, unlock, delete.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keepsake_common::{Capsule, CapsuleSummary, Difficulty, KeepsakeError, Puzzle, PuzzleType};

use crate::auth::AuthUser;
use crate::engine::UnlockOutcome;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCapsuleRequest {
    #[serde(default)]
    content: String,
    #[serde(default)]
    unlock_date: Option<String>,
}

/// Puzzle as shown before unlocking: never the content
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzlePreview {
    question: String,
    difficulty: Difficulty,
    hints: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SealedCapsule {
    id: String,
    unlock_date: DateTime<Utc>,
    puzzle: PuzzlePreview,
}

#[derive(Serialize)]
pub struct CreateCapsuleResponse {
    message: &'static str,
    capsule: SealedCapsule,
}

/// Seal a new capsule
pub async fn create_capsule(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateCapsuleRequest>,
) -> Result<(StatusCode, Json<CreateCapsuleResponse>), ApiError> {
    let unlock_date = payload
        .unlock_date
        .ok_or_else(|| KeepsakeError::BadRequest("Unlock date is required".to_string()))?;

    let capsule = state
        .capsules
        .create_capsule(&auth.user_id, &payload.content, &unlock_date)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateCapsuleResponse {
            message: "Time capsule created",
            capsule: SealedCapsule {
                id: capsule.id,
                unlock_date: capsule.unlock_date,
                puzzle: PuzzlePreview {
                    question: capsule.puzzle.question,
                    difficulty: capsule.puzzle.difficulty,
                    hints: capsule.puzzle.hints,
                },
            },
        }),
    ))
}

/// Caller's capsules, newest first
pub async fn list_capsules(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<CapsuleSummary>>, ApiError> {
    Ok(Json(state.capsules.list_capsules(&auth.user_id).await?))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedPuzzle {
    #[serde(rename = "type")]
    puzzle_type: PuzzleType,
    question: String,
    difficulty: Difficulty,
    hints: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedCapsule {
    id: String,
    puzzle: LockedPuzzle,
    unlock_date: DateTime<Utc>,
    is_unlocked: bool,
    unlock_attempts: u32,
    created_at: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenedCapsule {
    id: String,
    content: String,
    puzzle: Puzzle,
    unlock_date: DateTime<Utc>,
    is_unlocked: bool,
    unlocked_at: Option<DateTime<Utc>>,
    unlock_attempts: u32,
    created_at: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum CapsuleView {
    Locked(LockedCapsule),
    Opened(OpenedCapsule),
}

impl From<Capsule> for CapsuleView {
    fn from(capsule: Capsule) -> Self {
        if capsule.is_unlocked {
            return Self::Opened(OpenedCapsule {
                id: capsule.id,
                content: capsule.content,
                puzzle: capsule.puzzle,
                unlock_date: capsule.unlock_date,
                is_unlocked: true,
                unlocked_at: capsule.unlocked_at,
                unlock_attempts: capsule.unlock_attempts,
                created_at: capsule.created_at,
            });
        }

        Self::Locked(LockedCapsule {
            id: capsule.id,
            puzzle: LockedPuzzle {
                puzzle_type: capsule.puzzle.puzzle_type,
                question: capsule.puzzle.question,
                difficulty: capsule.puzzle.difficulty,
                hints: capsule.puzzle.hints,
            },
            unlock_date: capsule.unlock_date,
            is_unlocked: false,
            unlock_attempts: capsule.unlock_attempts,
            created_at: capsule.created_at,
        })
    }
}

/// One capsule; content only once unlocked
pub async fn get_capsule(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<CapsuleView>, ApiError> {
    let capsule = state.capsules.get_capsule(&id, &auth.user_id).await?;
    Ok(Json(capsule.into()))
}

#[derive(Deserialize)]
pub struct UnlockRequest {
    #[serde(default)]
    answer: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockedResponse {
    success: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    already_unlocked: bool,
    message: &'static str,
    content: String,
    unlocked_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct IncorrectResponse {
    success: bool,
    error: &'static str,
    feedback: String,
    attempts: u32,
    hint: String,
}

/// Answer a capsule's puzzle
pub async fn unlock_capsule(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UnlockRequest>,
) -> Result<Response, ApiError> {
    let (allowed, _remaining) = state.unlock_limiter.hit(&auth.user_id).await?;
    if !allowed {
        tracing::warn!(user_id = %auth.user_id, capsule_id = %id, "Unlock rate limit exceeded");
        return Err(KeepsakeError::RateLimited("Too many unlock attempts, try again in a minute".to_string()).into());
    }

    let outcome = state
        .capsules
        .unlock(&id, &auth.user_id, &payload.answer)
        .await?;

    let response = match outcome {
        UnlockOutcome::Unlocked {
            content,
            unlocked_at,
            already_unlocked,
        } => Json(UnlockedResponse {
            success: true,
            already_unlocked,
            message: if already_unlocked {
                "Capsule was already unlocked"
            } else {
                "Capsule is unlocked"
            },
            content,
            unlocked_at,
        })
        .into_response(),
        UnlockOutcome::Incorrect {
            feedback,
            attempts,
            hint,
        } => (
            StatusCode::BAD_REQUEST,
            Json(IncorrectResponse {
                success: false,
                error: "Incorrect answer",
                feedback,
                attempts,
                hint,
            }),
        )
            .into_response(),
    };

    Ok(response)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    message: &'static str,
    deleted_id: String,
}

/// Delete one of the caller's capsules
pub async fn delete_capsule(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted_id = state.capsules.delete_capsule(&id, &auth.user_id).await?;
    Ok(Json(DeleteResponse {
        message: "Capsule deleted successfully",
        deleted_id,
    }))
}
