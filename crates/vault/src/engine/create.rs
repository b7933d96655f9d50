//! Sealing, listing, viewing, and deleting capsules.

use chrono::{DateTime, NaiveDate, Utc};
use keepsake_common::constants::MAX_CONTENT_CHARS;
use keepsake_common::{Capsule, CapsuleSummary, KeepsakeError, Result, SkillLevel};

use super::{CapsuleService, generate_id};
use crate::oracle::{ContentVerdict, bounded};

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC)
pub fn parse_unlock_date(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc())
        .ok_or_else(|| KeepsakeError::BadRequest(format!("Invalid unlock date: {}", raw)))
}

impl CapsuleService {
    /// Validate content, generate its puzzle, and persist a locked capsule.
    ///
    /// Nothing is stored unless every step succeeds.
    pub async fn create_capsule(
        &self,
        owner_id: &str,
        content: &str,
        unlock_date: &str,
    ) -> Result<Capsule> {
        let content = content.trim();
        if content.is_empty() {
            return Err(KeepsakeError::BadRequest("Content is required".to_string()));
        }
        if content.chars().count() > MAX_CONTENT_CHARS {
            return Err(KeepsakeError::BadRequest(format!(
                "Content must be at most {} characters",
                MAX_CONTENT_CHARS
            )));
        }
        let unlock_date = parse_unlock_date(unlock_date)?;

        let verdict = self.validate_content(content).await?;
        if !verdict.accepted {
            tracing::info!(owner_id = %owner_id, reason = %verdict.reason, "Content rejected");
            return Err(KeepsakeError::ContentRejected(verdict.reason));
        }

        let skill_level = self.author_skill(owner_id).await?;
        let puzzle = bounded(
            self.settings.oracle_timeout,
            "Puzzle generation",
            self.generator.generate(content, skill_level),
        )
        .await?;

        let capsule = Capsule::seal(
            generate_id(),
            owner_id.to_string(),
            content.to_string(),
            puzzle,
            unlock_date,
            Utc::now(),
        );
        self.capsules.create(&capsule).await?;

        tracing::info!(
            capsule_id = %capsule.id,
            owner_id = %owner_id,
            difficulty = ?capsule.puzzle.difficulty,
            hints = capsule.puzzle.hints.len(),
            "Time capsule sealed"
        );

        Ok(capsule)
    }

    /// Run the content validator, retrying only when the oracle itself failed
    async fn validate_content(&self, content: &str) -> Result<ContentVerdict> {
        let mut attempt = 0;
        loop {
            let result = bounded(
                self.settings.oracle_timeout,
                "Content validation",
                self.validator.validate(content),
            )
            .await;

            match result {
                Err(e) if e.is_retryable() && attempt < self.settings.validation_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %e, "Content validation failed, retrying");
                }
                other => return other,
            }
        }
    }

    /// Skill tier used for generation; unknown authors get the default tier
    async fn author_skill(&self, owner_id: &str) -> Result<SkillLevel> {
        let level = self
            .users
            .get_by_id(owner_id)
            .await?
            .map(|user| user.profile.skill_level)
            .unwrap_or(SkillLevel::GENERATION_DEFAULT);
        Ok(level)
    }

    pub async fn list_capsules(&self, owner_id: &str) -> Result<Vec<CapsuleSummary>> {
        self.capsules.list_by_owner(owner_id).await
    }

    /// Owner-only read; the caller decides how much of a locked capsule to show
    pub async fn get_capsule(&self, capsule_id: &str, user_id: &str) -> Result<Capsule> {
        self.load_owned(capsule_id, user_id, "view").await
    }

    pub async fn delete_capsule(&self, capsule_id: &str, user_id: &str) -> Result<String> {
        self.load_owned(capsule_id, user_id, "delete").await?;

        if !self.capsules.delete(capsule_id).await? {
            return Err(KeepsakeError::NotFound);
        }

        tracing::info!(capsule_id = %capsule_id, user_id = %user_id, "Capsule deleted");
        Ok(capsule_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{FakeGenerator, FakeVerifier, harness};
    use crate::store::{CapsuleStore, UserStore};
    use keepsake_common::{Difficulty, UserProfile, UserRecord};
    use std::sync::atomic::Ordering;
    use tokio_test::{assert_err, assert_ok};

    const UNLOCK: &str = "2030-01-01T00:00:00Z";

    #[test]
    fn test_parse_unlock_date_formats() {
        let full = assert_ok!(parse_unlock_date("2030-01-01T12:30:00+02:00"));
        assert_eq!(full.to_rfc3339(), "2030-01-01T10:30:00+00:00");

        let day = assert_ok!(parse_unlock_date("2030-01-01"));
        assert_eq!(day.to_rfc3339(), "2030-01-01T00:00:00+00:00");

        assert_err!(parse_unlock_date("next tuesday"));
    }

    #[tokio::test]
    async fn test_create_seals_locked_capsule() {
        let h = harness(FakeGenerator::with_hints(&["h0"], Difficulty::Easy), FakeVerifier::expecting("peach"));

        let capsule = h
            .service
            .create_capsule("u1", "  Walked to the lake and ate a peach.  ", UNLOCK)
            .await
            .unwrap();

        assert_eq!(capsule.content, "Walked to the lake and ate a peach.");
        assert!(!capsule.is_unlocked);
        assert_eq!(capsule.unlock_attempts, 0);
        assert!(capsule.unlocked_at.is_none());

        let stored = h.capsules.get_by_id(&capsule.id).await.unwrap().unwrap();
        assert_eq!(stored.puzzle, capsule.puzzle);
    }

    #[tokio::test]
    async fn test_content_bounds() {
        let h = harness(FakeGenerator::with_hints(&[], Difficulty::Easy), FakeVerifier::expecting("x"));

        let empty = h.service.create_capsule("u1", "   ", UNLOCK).await;
        assert!(matches!(empty, Err(KeepsakeError::BadRequest(_))));

        let long = "a".repeat(MAX_CONTENT_CHARS + 1);
        let too_long = h.service.create_capsule("u1", &long, UNLOCK).await;
        assert!(matches!(too_long, Err(KeepsakeError::BadRequest(_))));

        let exact = "a".repeat(MAX_CONTENT_CHARS);
        assert_ok!(h.service.create_capsule("u1", &exact, UNLOCK).await);

        // Bounds are checked before any oracle call
        assert_eq!(h.validator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejected_content_persists_nothing() {
        let h = harness(FakeGenerator::with_hints(&[], Difficulty::Easy), FakeVerifier::expecting("x"));

        let result = h.service.create_capsule("u1", "please reject this", UNLOCK).await;
        assert!(matches!(result, Err(KeepsakeError::ContentRejected(_))));
        assert!(h.capsules.list_by_owner("u1").await.unwrap().is_empty());
        assert!(h.generator.seen_levels.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validation_oracle_failure_is_retried() {
        let h = harness(FakeGenerator::with_hints(&[], Difficulty::Easy), FakeVerifier::expecting("x"));
        h.validator.failures.store(1, Ordering::SeqCst);

        assert_ok!(h.service.create_capsule("u1", "A quiet morning", UNLOCK).await);
        assert_eq!(h.validator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_persistent_oracle_failure_surfaces() {
        let h = harness(FakeGenerator::with_hints(&[], Difficulty::Easy), FakeVerifier::expecting("x"));
        h.validator.failures.store(5, Ordering::SeqCst);

        let result = h.service.create_capsule("u1", "A quiet morning", UNLOCK).await;
        assert!(matches!(result, Err(KeepsakeError::OracleFailure(_))));
        assert!(h.capsules.list_by_owner("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generation_uses_author_skill() {
        let h = harness(FakeGenerator::with_hints(&[], Difficulty::Easy), FakeVerifier::expecting("x"));
        h.users
            .create(&UserRecord {
                id: "u1".into(),
                email: "a@example.com".into(),
                password_hash: "hash".into(),
                profile: UserProfile::default(),
                created_at: Utc::now(),
                version: 0,
            })
            .await
            .unwrap();

        h.service.create_capsule("u1", "A quiet morning", UNLOCK).await.unwrap();
        h.service.create_capsule("ghost", "A quiet morning", UNLOCK).await.unwrap();

        let levels = h.generator.seen_levels.lock().unwrap().clone();
        assert_eq!(levels, vec![SkillLevel::Beginner, SkillLevel::Intermediate]);
    }

    #[tokio::test]
    async fn test_view_and_delete_require_ownership() {
        let h = harness(FakeGenerator::with_hints(&[], Difficulty::Easy), FakeVerifier::expecting("x"));
        let capsule = h.service.create_capsule("u1", "A quiet morning", UNLOCK).await.unwrap();

        assert!(matches!(
            h.service.get_capsule(&capsule.id, "u2").await,
            Err(KeepsakeError::Forbidden(_))
        ));
        assert!(matches!(
            h.service.delete_capsule(&capsule.id, "u2").await,
            Err(KeepsakeError::Forbidden(_))
        ));
        assert!(matches!(
            h.service.get_capsule("missing", "u1").await,
            Err(KeepsakeError::NotFound)
        ));

        let deleted = h.service.delete_capsule(&capsule.id, "u1").await.unwrap();
        assert_eq!(deleted, capsule.id);
        assert!(matches!(
            h.service.get_capsule(&capsule.id, "u1").await,
            Err(KeepsakeError::NotFound)
        ));
    }
}
