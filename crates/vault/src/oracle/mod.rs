//! Judgment oracle contracts.
//!
//! Content validation, puzzle generation, and answer verification are all
//! answered by an external text-in/JSON-out service. Each concern sits
//! behind its own narrow trait so prompts and response shapes never leak
//! into the gate logic, and the oracle itself can be swapped.

mod client;
mod generator;
mod validator;
mod verifier;

pub use client::OpenAiOracle;
pub use generator::OraclePuzzleGenerator;
pub use validator::OracleContentValidator;
pub use verifier::OracleAnswerVerifier;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use keepsake_common::{KeepsakeError, Puzzle, Result, SkillLevel};
use serde::de::DeserializeOwned;

/// One stateless request to the judgment oracle
#[derive(Debug, Clone)]
pub struct OracleRequest {
    /// Role instructions for the model
    pub system: &'static str,
    /// Task prompt including the user's text
    pub prompt: String,
    /// Sampling temperature
    pub temperature: f32,
}

/// Text-in/JSON-out judgment service
#[async_trait]
pub trait JudgmentOracle: Send + Sync {
    /// Send one request and return the parsed JSON object.
    ///
    /// Transport failures and non-JSON replies are `OracleFailure`.
    async fn judge(&self, request: OracleRequest) -> Result<serde_json::Value>;
}

/// Outcome of content validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentVerdict {
    pub accepted: bool,
    pub reason: String,
}

/// Outcome of answer verification. `is_valid == false` is a normal result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerVerdict {
    pub is_valid: bool,
    pub feedback: String,
}

/// Judges whether submitted text is substantive enough for a puzzle
#[async_trait]
pub trait ContentValidator: Send + Sync {
    async fn validate(&self, content: &str) -> Result<ContentVerdict>;
}

/// Derives one puzzle from validated content
#[async_trait]
pub trait PuzzleGenerator: Send + Sync {
    async fn generate(&self, content: &str, skill_level: SkillLevel) -> Result<Puzzle>;
}

/// Judges a free-text answer against the original content
#[async_trait]
pub trait AnswerVerifier: Send + Sync {
    async fn verify(&self, question: &str, answer: &str, original_content: &str)
    -> Result<AnswerVerdict>;
}

/// Decode an oracle reply into the expected shape
pub(crate) fn decode<T: DeserializeOwned>(value: serde_json::Value, what: &str) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| KeepsakeError::OracleFailure(format!("Malformed {} response: {}", what, e)))
}

/// Apply a deadline to an oracle call. Expiry is an oracle failure.
pub async fn bounded<T, F>(limit: Duration, what: &str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation = %what, timeout_ms = limit.as_millis() as u64, "Oracle call timed out");
            Err(KeepsakeError::OracleFailure(format!(
                "{} timed out after {}ms",
                what,
                limit.as_millis()
            )))
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_times_out_as_oracle_failure() {
        let result: Result<()> = bounded(Duration::from_millis(10), "verification", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(KeepsakeError::OracleFailure(_))));
    }

    #[tokio::test]
    async fn test_bounded_passes_result_through() {
        let result = bounded(Duration::from_secs(1), "generation", async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
