//! Answer verification against the original entry.

use std::sync::Arc;

use async_trait::async_trait;
use keepsake_common::Result;
use serde::Deserialize;

use super::{AnswerVerdict, AnswerVerifier, JudgmentOracle, OracleRequest, decode};

const SYSTEM: &str = "You are evaluating personal reflection. Return only valid JSON.";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVerdict {
    is_valid: bool,
    #[serde(default)]
    feedback: String,
}

/// Answer verifier backed by the judgment oracle
pub struct OracleAnswerVerifier {
    oracle: Arc<dyn JudgmentOracle>,
}

impl OracleAnswerVerifier {
    pub fn new(oracle: Arc<dyn JudgmentOracle>) -> Self {
        Self { oracle }
    }

    fn prompt(question: &str, answer: &str, original_content: &str) -> String {
        format!(
            r#"You are evaluating whether a user has correctly answered trivia or demonstrated personal growth within a reasonable degree.

Original content that the user wrote: "{original_content}"
Puzzle question: "{question}"
User's answer to the question: "{answer}"

Treat the original content as the ground truth. Determine if their answer demonstrates:
an understanding of their past experience, thoughtful engagement with the question, and/or evidence of reflection or growth.

Return only valid JSON in the following format:
{{
    "isValid": true | false,
    "feedback": "Brief explanation of why the answer does or doesn't show recall or reflection, referring to the original content."
}}"#
        )
    }
}

#[async_trait]
impl AnswerVerifier for OracleAnswerVerifier {
    async fn verify(
        &self,
        question: &str,
        answer: &str,
        original_content: &str,
    ) -> Result<AnswerVerdict> {
        let reply = self
            .oracle
            .judge(OracleRequest {
                system: SYSTEM,
                prompt: Self::prompt(question, answer, original_content),
                temperature: 0.3,
            })
            .await?;

        let raw: RawVerdict = decode(reply, "verification")?;
        Ok(AnswerVerdict {
            is_valid: raw.is_valid,
            feedback: raw.feedback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::testing::ScriptedOracle;
    use keepsake_common::KeepsakeError;
    use serde_json::json;

    #[tokio::test]
    async fn test_prompt_carries_ground_truth() {
        let oracle = Arc::new(ScriptedOracle::new(vec![Ok(json!({
            "isValid": false,
            "feedback": "You ate a peach, not an apple."
        }))]));
        let verifier = OracleAnswerVerifier::new(oracle.clone());

        let verdict = verifier
            .verify("What fruit?", "an apple", "Walked to the lake and ate a peach.")
            .await
            .unwrap();

        assert!(!verdict.is_valid);
        assert_eq!(verdict.feedback, "You ate a peach, not an apple.");

        let prompt = &oracle.prompts.lock().unwrap()[0];
        assert!(prompt.contains("ate a peach"));
        assert!(prompt.contains("an apple"));
        assert!(prompt.contains("What fruit?"));
    }

    #[tokio::test]
    async fn test_missing_verdict_is_failure_not_incorrect() {
        let oracle = Arc::new(ScriptedOracle::new(vec![Ok(json!({"feedback": "hmm"}))]));
        let result = OracleAnswerVerifier::new(oracle).verify("Q", "A", "C").await;
        assert!(matches!(result, Err(KeepsakeError::OracleFailure(_))));
    }
}
