//! Capsule lifecycle.
//!
//! Creation: content checks -> content validator -> puzzle generator ->
//! capsule store. Unlock: ordered gates -> answer verifier -> compare-and-swap
//! write -> skill progression.
//!
//! The service borrows capsule and user records for one request at a time
//! and writes back through the stores; it keeps no state of its own.

mod create;
mod unlock;

pub use unlock::UnlockOutcome;

use std::sync::Arc;
use std::time::Duration;

use keepsake_common::{Capsule, KeepsakeError, Result};

use crate::oracle::{AnswerVerifier, ContentValidator, PuzzleGenerator};
use crate::store::{CapsuleStore, UserStore};

/// Cryptographically random record identifier
pub fn generate_id() -> String {
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    use rand::Rng;

    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Tunables for oracle calls made by the engine
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Deadline for each oracle call
    pub oracle_timeout: Duration,
    /// Extra attempts after a content validation oracle failure
    pub validation_retries: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            oracle_timeout: Duration::from_secs(keepsake_common::constants::DEFAULT_ORACLE_TIMEOUT_SECS),
            validation_retries: 1,
        }
    }
}

/// Capsule creation, access, and unlock orchestration
pub struct CapsuleService {
    capsules: Arc<dyn CapsuleStore>,
    users: Arc<dyn UserStore>,
    validator: Arc<dyn ContentValidator>,
    generator: Arc<dyn PuzzleGenerator>,
    verifier: Arc<dyn AnswerVerifier>,
    settings: EngineSettings,
}

impl CapsuleService {
    pub fn new(
        capsules: Arc<dyn CapsuleStore>,
        users: Arc<dyn UserStore>,
        validator: Arc<dyn ContentValidator>,
        generator: Arc<dyn PuzzleGenerator>,
        verifier: Arc<dyn AnswerVerifier>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            capsules,
            users,
            validator,
            generator,
            verifier,
            settings,
        }
    }

    /// Existence then ownership gate
    async fn load_owned(&self, capsule_id: &str, user_id: &str, action: &str) -> Result<Capsule> {
        let capsule = self
            .capsules
            .get_by_id(capsule_id)
            .await?
            .ok_or(KeepsakeError::NotFound)?;

        if !capsule.is_owned_by(user_id) {
            tracing::warn!(
                capsule_id = %capsule_id,
                user_id = %user_id,
                "Capsule access denied"
            );
            return Err(KeepsakeError::Forbidden(format!("Not authorized to {} this capsule", action)));
        }

        Ok(capsule)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Stand-ins for the oracle contracts.

    use super::*;
    use crate::oracle::{AnswerVerdict, ContentVerdict};
    use crate::store::{MemoryCapsuleStore, MemoryUserStore};
    use async_trait::async_trait;
    use keepsake_common::{Difficulty, Puzzle, PuzzleType, SkillLevel};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Accepts content unless it contains "reject"; fails while `failures` > 0
    #[derive(Default)]
    pub struct FakeValidator {
        pub failures: AtomicUsize,
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl ContentValidator for FakeValidator {
        async fn validate(&self, content: &str) -> Result<ContentVerdict> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(KeepsakeError::OracleFailure("flaky".into()));
            }
            Ok(ContentVerdict {
                accepted: !content.contains("reject"),
                reason: "Entry is too thin to remember".into(),
            })
        }
    }

    /// Returns a fixed puzzle and records the skill level it was asked for
    pub struct FakeGenerator {
        pub puzzle: Puzzle,
        pub seen_levels: Mutex<Vec<SkillLevel>>,
    }

    impl FakeGenerator {
        pub fn with_hints(hints: &[&str], difficulty: Difficulty) -> Self {
            Self {
                puzzle: Puzzle {
                    puzzle_type: PuzzleType::Trivia,
                    question: "What did you eat after the walk?".into(),
                    difficulty,
                    hints: hints.iter().map(|h| h.to_string()).collect(),
                },
                seen_levels: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PuzzleGenerator for FakeGenerator {
        async fn generate(&self, _content: &str, skill_level: SkillLevel) -> Result<Puzzle> {
            self.seen_levels.lock().unwrap().push(skill_level);
            Ok(self.puzzle.clone())
        }
    }

    /// Correct iff the answer equals `expected`; optionally slow or failing
    pub struct FakeVerifier {
        pub expected: String,
        pub delay: Duration,
        pub fail: bool,
        pub calls: AtomicUsize,
    }

    impl FakeVerifier {
        pub fn expecting(expected: &str) -> Self {
            Self {
                expected: expected.into(),
                delay: Duration::ZERO,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AnswerVerifier for FakeVerifier {
        async fn verify(&self, _question: &str, answer: &str, _content: &str) -> Result<AnswerVerdict> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(KeepsakeError::OracleFailure("oracle down".into()));
            }
            let is_valid = answer.eq_ignore_ascii_case(&self.expected);
            Ok(AnswerVerdict {
                is_valid,
                feedback: if is_valid {
                    "You remembered the peach.".into()
                } else {
                    "The entry mentions a different food.".into()
                },
            })
        }
    }

    pub struct Harness {
        pub service: Arc<CapsuleService>,
        pub capsules: Arc<MemoryCapsuleStore>,
        pub users: Arc<MemoryUserStore>,
        pub validator: Arc<FakeValidator>,
        pub generator: Arc<FakeGenerator>,
        pub verifier: Arc<FakeVerifier>,
    }

    pub fn harness(generator: FakeGenerator, verifier: FakeVerifier) -> Harness {
        let capsules = Arc::new(MemoryCapsuleStore::new());
        let users = Arc::new(MemoryUserStore::new());
        let validator = Arc::new(FakeValidator::default());
        let generator = Arc::new(generator);
        let verifier = Arc::new(verifier);

        let service = Arc::new(CapsuleService::new(
            capsules.clone(),
            users.clone(),
            validator.clone(),
            generator.clone(),
            verifier.clone(),
            EngineSettings {
                oracle_timeout: Duration::from_millis(200),
                validation_retries: 1,
            },
        ));

        Harness {
            service,
            capsules,
            users,
            validator,
            generator,
            verifier,
        }
    }
}
