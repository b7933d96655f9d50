//! Unlock state machine.
//!
//! Gates run in order and the first failure decides the response:
//! existence, ownership, already-unlocked short-circuit, unlock date,
//! non-empty answer. Only then is the verifier consulted and the attempt
//! counted. Gate rejections and oracle failures leave the capsule untouched.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use keepsake_common::{Capsule, Difficulty, KeepsakeError, Result, advance};

use super::CapsuleService;
use crate::oracle::bounded;
use crate::store::UserStore;

/// Profile credit gives up after this many lost compare-and-swap rounds
const MAX_PROFILE_CAS_ROUNDS: usize = 16;

/// Result of an evaluated (or short-circuited) unlock request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockOutcome {
    /// Content is visible. `already_unlocked` marks the short-circuit path.
    Unlocked {
        content: String,
        unlocked_at: DateTime<Utc>,
        already_unlocked: bool,
    },
    /// Wrong answer; the capsule stays locked
    Incorrect {
        feedback: String,
        attempts: u32,
        hint: String,
    },
}

impl UnlockOutcome {
    fn already_unlocked(capsule: &Capsule) -> Result<Self> {
        let unlocked_at = capsule.unlocked_at.ok_or_else(|| {
            KeepsakeError::Internal(format!("Capsule {} is unlocked without a timestamp", capsule.id))
        })?;
        Ok(Self::Unlocked {
            content: capsule.content.clone(),
            unlocked_at,
            already_unlocked: true,
        })
    }
}

impl CapsuleService {
    pub async fn unlock(&self, capsule_id: &str, user_id: &str, answer: &str) -> Result<UnlockOutcome> {
        self.unlock_at(capsule_id, user_id, answer, Utc::now()).await
    }

    pub(crate) async fn unlock_at(
        &self,
        capsule_id: &str,
        user_id: &str,
        answer: &str,
        now: DateTime<Utc>,
    ) -> Result<UnlockOutcome> {
        let capsule = self.load_owned(capsule_id, user_id, "unlock").await?;

        if capsule.is_unlocked {
            return UnlockOutcome::already_unlocked(&capsule);
        }

        if !capsule.is_eligible(now) {
            let days_left = capsule.days_left(now);
            tracing::debug!(capsule_id = %capsule_id, days_left, "Unlock attempted too early");
            return Err(KeepsakeError::NotYetEligible {
                unlock_date: capsule.unlock_date,
                days_left,
            });
        }

        let answer = answer.trim();
        if answer.is_empty() {
            return Err(KeepsakeError::BadRequest("Please provide an answer".to_string()));
        }

        let verdict = bounded(
            self.settings.oracle_timeout,
            "Answer verification",
            self.verifier
                .verify(&capsule.puzzle.question, answer, &capsule.content),
        )
        .await?;

        // Question and content are immutable, so the verdict stays valid
        // if another request changes the record underneath us.
        let mut current = capsule;
        loop {
            let mut next = current.clone();
            let transitioned = next.record_attempt(verdict.is_valid, now);

            if self.capsules.update(&next).await? {
                if transitioned {
                    tracing::info!(
                        capsule_id = %capsule_id,
                        user_id = %user_id,
                        attempts = next.unlock_attempts,
                        "Capsule unlocked"
                    );
                    // Runs on its own task so a dropped request still credits
                    let credit = tokio::spawn(credit_completion(
                        self.users.clone(),
                        user_id.to_string(),
                        next.puzzle.difficulty,
                    ));
                    if let Err(e) = credit.await {
                        tracing::error!(user_id = %user_id, error = %e, "Profile credit task failed");
                    }
                    return Ok(UnlockOutcome::Unlocked {
                        content: next.content,
                        unlocked_at: now,
                        already_unlocked: false,
                    });
                }

                tracing::debug!(
                    capsule_id = %capsule_id,
                    attempts = next.unlock_attempts,
                    "Incorrect unlock answer"
                );
                return Ok(UnlockOutcome::Incorrect {
                    hint: next.current_hint().to_string(),
                    attempts: next.unlock_attempts,
                    feedback: verdict.feedback,
                });
            }

            // Lost the compare-and-swap: re-read and re-apply
            current = self
                .capsules
                .get_by_id(capsule_id)
                .await?
                .ok_or(KeepsakeError::NotFound)?;
            if current.is_unlocked {
                return UnlockOutcome::already_unlocked(&current);
            }
        }
    }
}

/// Apply skill progression for one solved puzzle.
///
/// The capsule is already unlocked at this point; a failure here is
/// logged rather than reported, since the unlock itself stands.
async fn credit_completion(users: Arc<dyn UserStore>, user_id: String, difficulty: Difficulty) {
    for _ in 0..MAX_PROFILE_CAS_ROUNDS {
        let mut user = match users.get_by_id(&user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::warn!(user_id = %user_id, "No profile to credit");
                return;
            }
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Failed to load profile for credit");
                return;
            }
        };

        let before = user.profile;
        let outcome = advance(difficulty, before.posts_completed, before.skill_level);
        user.profile.posts_completed = outcome.posts_completed;
        user.profile.skill_level = outcome.skill_level;

        match users.update(&user).await {
            Ok(true) => {
                if outcome.skill_level != before.skill_level {
                    tracing::info!(
                        user_id = %user_id,
                        skill_level = outcome.skill_level.as_str(),
                        "Skill level raised"
                    );
                }
                return;
            }
            Ok(false) => continue,
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Failed to store profile credit");
                return;
            }
        }
    }
    tracing::error!(user_id = %user_id, "Gave up crediting profile after repeated conflicts");
}
