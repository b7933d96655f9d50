//! Content validation: is this entry substantive enough to build a puzzle on?

use std::sync::Arc;

use async_trait::async_trait;
use keepsake_common::Result;
use serde::Deserialize;

use super::{ContentValidator, ContentVerdict, JudgmentOracle, OracleRequest, decode};

const SYSTEM: &str = "You review journal entries for a time capsule app. Return only valid JSON.";

#[derive(Deserialize)]
struct RawVerdict {
    accepted: bool,
    #[serde(default)]
    reason: String,
}

/// Content validator backed by the judgment oracle
pub struct OracleContentValidator {
    oracle: Arc<dyn JudgmentOracle>,
}

impl OracleContentValidator {
    pub fn new(oracle: Arc<dyn JudgmentOracle>) -> Self {
        Self { oracle }
    }

    fn prompt(content: &str) -> String {
        format!(
            r#"Decide whether the following journal entry is substantive enough to base a personal memory puzzle on.

Entry: "{content}"

Reject the entry if it is empty, purely mechanical (keyboard mashing, repeated characters, filler), or incoherent.
Accept any entry that describes an experience, thought, or feeling, however short.

Return only valid JSON in the following format:
{{
    "accepted": true | false,
    "reason": "One sentence the author can read explaining the decision."
}}"#
        )
    }
}

#[async_trait]
impl ContentValidator for OracleContentValidator {
    async fn validate(&self, content: &str) -> Result<ContentVerdict> {
        let reply = self
            .oracle
            .judge(OracleRequest {
                system: SYSTEM,
                prompt: Self::prompt(content),
                temperature: 0.0,
            })
            .await?;

        let raw: RawVerdict = decode(reply, "validation")?;
        let reason = match raw.reason.trim() {
            "" if raw.accepted => "Content accepted".to_string(),
            "" => "Content is not substantive enough for a puzzle".to_string(),
            reason => reason.to_string(),
        };

        Ok(ContentVerdict {
            accepted: raw.accepted,
            reason,
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
    async fn test_rejection_carries_reason() {
        let oracle = Arc::new(ScriptedOracle::new(vec![Ok(json!({
            "accepted": false,
            "reason": "This looks like keyboard mashing."
        }))]));
        let validator = OracleContentValidator::new(oracle.clone());

        let verdict = validator.validate("asdfasdfasdf").await.unwrap();
        assert!(!verdict.accepted);
        assert_eq!(verdict.reason, "This looks like keyboard mashing.");
        assert!(oracle.prompts.lock().unwrap()[0].contains("asdfasdfasdf"));
    }

    #[tokio::test]
    async fn test_missing_reason_gets_default() {
        let oracle = Arc::new(ScriptedOracle::new(vec![Ok(json!({"accepted": false}))]));
        let verdict = OracleContentValidator::new(oracle).validate("...").await.unwrap();
        assert!(!verdict.reason.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_reply_is_oracle_failure() {
        let oracle = Arc::new(ScriptedOracle::new(vec![Ok(json!({"verdict": "yes"}))]));
        let result = OracleContentValidator::new(oracle).validate("A day at the lake").await;
        assert!(matches!(result, Err(KeepsakeError::OracleFailure(_))));
    }
}
