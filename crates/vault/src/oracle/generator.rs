//! Puzzle generation from journal content.
//!
//! The oracle is asked for exactly one puzzle built only from facts in the
//! entry. Difficulty and phrasing follow the author's skill tier.

use std::sync::Arc;

use async_trait::async_trait;
use keepsake_common::{Difficulty, KeepsakeError, Puzzle, PuzzleType, Result, SkillLevel};
use serde::Deserialize;

use super::{JudgmentOracle, OracleRequest, PuzzleGenerator, decode};

const SYSTEM: &str = "You are a puzzle generator for a time capsule app. Return only valid JSON.";

#[derive(Deserialize)]
struct RawPuzzle {
    /// Set when the oracle refuses to build a puzzle from this content
    #[serde(default)]
    rejected: bool,
    #[serde(default)]
    reason: Option<String>,
    #[serde(rename = "type")]
    puzzle_type: Option<PuzzleType>,
    question: Option<String>,
    difficulty: Option<Difficulty>,
    #[serde(default)]
    hints: Vec<String>,
}

/// Puzzle generator backed by the judgment oracle
pub struct OraclePuzzleGenerator {
    oracle: Arc<dyn JudgmentOracle>,
}

impl OraclePuzzleGenerator {
    pub fn new(oracle: Arc<dyn JudgmentOracle>) -> Self {
        Self { oracle }
    }

    fn tier_guidance(skill_level: SkillLevel) -> &'static str {
        match skill_level {
            SkillLevel::Beginner => {
                "The author is a beginner: prefer an easy puzzle about a concrete, memorable detail, phrased plainly."
            }
            SkillLevel::Intermediate => {
                "The author is intermediate: prefer a medium puzzle that connects two details or asks why something happened."
            }
            SkillLevel::Advanced => {
                "The author is advanced: prefer a hard puzzle about a subtle detail or a reflection on what changed since."
            }
        }
    }

    fn prompt(content: &str, skill_level: SkillLevel) -> String {
        let guidance = Self::tier_guidance(skill_level);
        format!(
            r#"You are creating a personalized puzzle for a time capsule. Based on the following content created by the user, create a puzzle that only their future self could solve. It should be a test of their memory.

User's content: "{content}"

User's skill level: {level}. {guidance}

Rules:
- Use only facts present in the content. Do not introduce people, places, or events the content does not mention.
- For a trivia puzzle, ask about something they experienced or learned in what they wrote.
- For a reflection puzzle, ask an open-ended question about personal growth.
- Hints are ordered from weakest to most revealing. No hint may reveal the answer.
- If the content cannot support any puzzle, return {{"rejected": true, "reason": "..."}} instead.

Generate a puzzle in the following JSON format:
{{
    "type": "trivia" | "reflection",
    "question": "The puzzle question or prompt",
    "difficulty": "easy" | "medium" | "hard",
    "hints": ["hint1", "hint2"]
}}

Return only valid JSON, no other text."#,
            level = skill_level.as_str(),
        )
    }
}

#[async_trait]
impl PuzzleGenerator for OraclePuzzleGenerator {
    async fn generate(&self, content: &str, skill_level: SkillLevel) -> Result<Puzzle> {
        let reply = self
            .oracle
            .judge(OracleRequest {
                system: SYSTEM,
                prompt: Self::prompt(content, skill_level),
                temperature: 0.7,
            })
            .await?;

        let raw: RawPuzzle = decode(reply, "puzzle")?;
        into_puzzle(raw)
    }
}

fn into_puzzle(raw: RawPuzzle) -> Result<Puzzle> {
    if raw.rejected {
        let reason = raw
            .reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| "Content cannot support a puzzle".to_string());
        return Err(KeepsakeError::ContentRejected(reason));
    }

    let missing = |field: &str| KeepsakeError::OracleFailure(format!("Puzzle is missing `{}`", field));

    let puzzle_type = raw.puzzle_type.ok_or_else(|| missing("type"))?;
    let difficulty = raw.difficulty.ok_or_else(|| missing("difficulty"))?;
    let question = raw
        .question
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| missing("question"))?;

    let hints = raw
        .hints
        .into_iter()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .collect();

    Ok(Puzzle {
        puzzle_type,
        question,
        difficulty,
        hints,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::testing::ScriptedOracle;
    use serde_json::json;

    fn generator(reply: serde_json::Value) -> (Arc<ScriptedOracle>, OraclePuzzleGenerator) {
        let oracle = Arc::new(ScriptedOracle::new(vec![Ok(reply)]));
        (oracle.clone(), OraclePuzzleGenerator::new(oracle))
    }

    #[tokio::test]
    async fn test_generates_puzzle() {
        let (oracle, generator) = generator(json!({
            "type": "trivia",
            "question": "What did you eat by the lake?",
            "difficulty": "easy",
            "hints": ["think about the walk", "  ", "what did you eat"]
        }));

        let puzzle = generator
            .generate("Walked to the lake and ate a peach.", SkillLevel::Beginner)
            .await
            .unwrap();

        assert_eq!(puzzle.puzzle_type, PuzzleType::Trivia);
        assert_eq!(puzzle.difficulty, Difficulty::Easy);
        assert_eq!(puzzle.hints, vec!["think about the walk", "what did you eat"]);

        let prompt = &oracle.prompts.lock().unwrap()[0];
        assert!(prompt.contains("User's skill level: beginner"));
        assert!(prompt.contains("ate a peach"));
    }

    #[tokio::test]
    async fn test_hints_may_be_absent() {
        let (_, generator) = generator(json!({
            "type": "reflection",
            "question": "How has your view of the move changed?",
            "difficulty": "hard"
        }));
        let puzzle = generator.generate("We moved.", SkillLevel::Advanced).await.unwrap();
        assert!(puzzle.hints.is_empty());
    }

    #[tokio::test]
    async fn test_rejection_is_distinct() {
        let (_, generator) = generator(json!({"rejected": true, "reason": "Nothing to ask about"}));
        let result = generator.generate("ok", SkillLevel::Intermediate).await;
        assert!(matches!(result, Err(KeepsakeError::ContentRejected(r)) if r == "Nothing to ask about"));
    }

    #[tokio::test]
    async fn test_unknown_difficulty_is_malformed() {
        let (_, generator) = generator(json!({
            "type": "trivia",
            "question": "Q?",
            "difficulty": "legendary",
            "hints": []
        }));
        let result = generator.generate("text", SkillLevel::Intermediate).await;
        assert!(matches!(result, Err(KeepsakeError::OracleFailure(_))));
    }

    #[tokio::test]
    async fn test_blank_question_is_malformed() {
        let (_, generator) = generator(json!({
            "type": "trivia",
            "question": "   ",
            "difficulty": "easy"
        }));
        let result = generator.generate("text", SkillLevel::Intermediate).await;
        assert!(matches!(result, Err(KeepsakeError::OracleFailure(_))));
    }
}
