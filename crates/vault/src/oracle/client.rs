//! OpenAI-compatible chat completion client used as the judgment oracle.

use std::time::Duration;

use async_trait::async_trait;
use keepsake_common::{KeepsakeError, Result};
use serde::Deserialize;
use serde_json::json;

use super::{JudgmentOracle, OracleRequest};

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Chat completion oracle that requests JSON-object output
pub struct OpenAiOracle {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiOracle {
    pub fn new(api_url: String, api_key: String, model: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KeepsakeError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_url,
            api_key,
            model,
        })
    }

    fn request_body(&self, request: &OracleRequest) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.prompt},
            ],
            "temperature": request.temperature,
            "response_format": {"type": "json_object"},
        })
    }
}

#[async_trait]
impl JudgmentOracle for OpenAiOracle {
    async fn judge(&self, request: OracleRequest) -> Result<serde_json::Value> {
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(&request))
            .send()
            .await
            .map_err(|e| KeepsakeError::OracleFailure(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %body, "Oracle returned an error status");
            return Err(KeepsakeError::OracleFailure(format!(
                "Oracle responded with status {}",
                status
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| KeepsakeError::OracleFailure(format!("Unreadable response: {}", e)))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| KeepsakeError::OracleFailure("Response had no content".to_string()))?;

        parse_reply(&content)
    }
}

/// The reply must be a single JSON object
fn parse_reply(content: &str) -> Result<serde_json::Value> {
    let value: serde_json::Value = serde_json::from_str(content.trim())
        .map_err(|e| KeepsakeError::OracleFailure(format!("Reply was not JSON: {}", e)))?;

    if !value.is_object() {
        return Err(KeepsakeError::OracleFailure(
            "Reply was not a JSON object".to_string(),
        ));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply_object() {
        let value = parse_reply(" {\"isValid\": true, \"feedback\": \"ok\"} ").unwrap();
        assert_eq!(value["isValid"], true);
    }

    #[test]
    fn test_parse_reply_rejects_garbage() {
        assert!(matches!(
            parse_reply("Sure! Here is your puzzle"),
            Err(KeepsakeError::OracleFailure(_))
        ));
        assert!(matches!(parse_reply("[1, 2]"), Err(KeepsakeError::OracleFailure(_))));
    }

    #[test]
    fn test_request_body_asks_for_json() {
        let oracle = OpenAiOracle::new(
            "http://localhost/v1/chat/completions".into(),
            "key".into(),
            "gpt-4o-mini".into(),
            Duration::from_secs(5),
        )
        .unwrap();
        let body = oracle.request_body(&OracleRequest {
            system: "system text",
            prompt: "prompt text".into(),
            temperature: 0.3,
        });

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][1]["content"], "prompt text");
    }
}
