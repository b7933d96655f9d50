//! Core types shared across Keepsake components.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::NO_MORE_HINTS;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Puzzle style chosen by the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PuzzleType {
    /// Recall a fact from the entry
    Trivia,
    /// Open-ended question about personal growth
    Reflection,
}

/// Puzzle difficulty levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// postsCompleted credit granted for solving a puzzle of this difficulty
    pub fn credit(&self) -> u32 {
        match self {
            Self::Easy => 1,
            Self::Medium => 3,
            Self::Hard => 5,
        }
    }
}

/// User skill tier.
///
/// Ordered so that `Beginner < Intermediate < Advanced`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl SkillLevel {
    /// Skill level assumed when generating a puzzle for an unknown author
    pub const GENERATION_DEFAULT: SkillLevel = SkillLevel::Intermediate;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

/// Puzzle sealed into a capsule. Set once at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Puzzle {
    #[serde(rename = "type")]
    pub puzzle_type: PuzzleType,
    pub question: String,
    pub difficulty: Difficulty,
    /// Ordered weakest first
    #[serde(default)]
    pub hints: Vec<String>,
}

/// A sealed journal entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capsule {
    pub id: String,
    pub owner_id: String,
    pub content: String,
    pub puzzle: Puzzle,
    pub unlock_date: DateTime<Utc>,
    pub is_unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
    pub unlock_attempts: u32,
    pub created_at: DateTime<Utc>,

    /// Store revision, bumped on every successful update
    #[serde(default)]
    pub version: u64,
}

impl Capsule {
    /// Seal a new, locked capsule
    pub fn seal(
        id: String,
        owner_id: String,
        content: String,
        puzzle: Puzzle,
        unlock_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id,
            content,
            puzzle,
            unlock_date,
            is_unlocked: false,
            unlocked_at: None,
            unlock_attempts: 0,
            created_at: now,
            version: 0,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    /// The unlock date is an inclusive boundary
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        now >= self.unlock_date
    }

    /// Whole days (rounded up) until the capsule becomes eligible; 0 once eligible
    pub fn days_left(&self, now: DateTime<Utc>) -> i64 {
        let millis = (self.unlock_date - now).num_milliseconds();
        if millis <= 0 {
            0
        } else {
            (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
        }
    }

    /// Count one evaluated attempt and, if it was correct, unlock.
    ///
    /// Returns true only when this call performed the Locked -> Unlocked
    /// transition. An unlocked capsule is left untouched.
    pub fn record_attempt(&mut self, correct: bool, now: DateTime<Utc>) -> bool {
        if self.is_unlocked {
            return false;
        }
        self.unlock_attempts += 1;
        if correct {
            self.is_unlocked = true;
            self.unlocked_at = Some(now);
        }
        correct
    }

    /// Hint for the current attempt count: earlier wrong answers surface milder hints
    pub fn current_hint(&self) -> &str {
        let Some(last) = self.puzzle.hints.len().checked_sub(1) else {
            return NO_MORE_HINTS;
        };
        let index = (self.unlock_attempts as usize).saturating_sub(1).min(last);
        self.puzzle
            .hints
            .get(index)
            .map(String::as_str)
            .unwrap_or(NO_MORE_HINTS)
    }

    pub fn summary(&self) -> CapsuleSummary {
        CapsuleSummary {
            id: self.id.clone(),
            puzzle: self.puzzle.clone(),
            unlock_date: self.unlock_date,
            is_unlocked: self.is_unlocked,
            unlocked_at: self.unlocked_at,
            unlock_attempts: self.unlock_attempts,
            created_at: self.created_at,
        }
    }
}

/// Capsule listing entry; never carries content
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapsuleSummary {
    pub id: String,
    pub puzzle: Puzzle,
    pub unlock_date: DateTime<Utc>,
    pub is_unlocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<DateTime<Utc>>,
    pub unlock_attempts: u32,
    pub created_at: DateTime<Utc>,
}

/// Progression state of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub skill_level: SkillLevel,
    pub posts_completed: u32,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            skill_level: SkillLevel::Beginner,
            posts_completed: 0,
        }
    }
}

/// Stored user account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub email: String,

    /// PHC-formatted Argon2 hash (server-side only)
    pub password_hash: String,

    pub profile: UserProfile,
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub version: u64,
}

impl UserRecord {
    pub fn view(&self) -> UserView {
        UserView {
            id: self.id.clone(),
            email: self.email.clone(),
            profile: self.profile,
            created_at: self.created_at,
        }
    }
}

/// User account as returned to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub profile: UserProfile,
    pub created_at: DateTime<Utc>,
}
