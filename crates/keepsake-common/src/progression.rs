//! Skill progression policy.
//!
//! A pure mapping from a solved puzzle's difficulty and the user's current
//! progress to their new progress. Neither output ever decreases.

use crate::constants::{ADVANCED_THRESHOLD, INTERMEDIATE_THRESHOLD};
use crate::types::{Difficulty, SkillLevel};

/// New progression state after crediting one completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressionOutcome {
    pub posts_completed: u32,
    pub skill_level: SkillLevel,
}

/// Credit one solved puzzle and re-evaluate the tier
pub fn advance(
    difficulty: Difficulty,
    posts_completed: u32,
    skill_level: SkillLevel,
) -> ProgressionOutcome {
    let posts_completed = posts_completed.saturating_add(difficulty.credit());

    let earned = if posts_completed >= ADVANCED_THRESHOLD {
        SkillLevel::Advanced
    } else if posts_completed >= INTERMEDIATE_THRESHOLD {
        SkillLevel::Intermediate
    } else {
        skill_level
    };

    ProgressionOutcome {
        posts_completed,
        skill_level: earned.max(skill_level),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credits_per_difficulty() {
        assert_eq!(advance(Difficulty::Easy, 0, SkillLevel::Beginner).posts_completed, 1);
        assert_eq!(advance(Difficulty::Medium, 0, SkillLevel::Beginner).posts_completed, 3);
        assert_eq!(advance(Difficulty::Hard, 0, SkillLevel::Beginner).posts_completed, 5);
    }

    #[test]
    fn test_intermediate_threshold() {
        let outcome = advance(Difficulty::Easy, 24, SkillLevel::Beginner);
        assert_eq!(outcome.posts_completed, 25);
        assert_eq!(outcome.skill_level, SkillLevel::Intermediate);
    }

    #[test]
    fn test_advanced_threshold() {
        let outcome = advance(Difficulty::Hard, 99, SkillLevel::Intermediate);
        assert_eq!(outcome.posts_completed, 104);
        assert_eq!(outcome.skill_level, SkillLevel::Advanced);
    }

    #[test]
    fn test_beginner_stays_beginner_below_threshold() {
        let outcome = advance(Difficulty::Medium, 10, SkillLevel::Beginner);
        assert_eq!(outcome.skill_level, SkillLevel::Beginner);
    }

    #[test]
    fn test_never_demotes() {
        // A tier granted elsewhere is never taken away
        let outcome = advance(Difficulty::Easy, 3, SkillLevel::Advanced);
        assert_eq!(outcome.skill_level, SkillLevel::Advanced);
        assert_eq!(outcome.posts_completed, 4);
    }
}
