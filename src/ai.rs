//! Model client.
//!
//! One blocking `generateContent` call per report. No retries: a failure is
//! surfaced to the operator and the snapshot stays on disk for the next try.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::AiConfig;
use crate::error::AiError;

pub trait ModelClient {
    fn generate(&self, prompt: &str) -> Result<String, AiError>;
}

pub struct GeminiClient {
    config: AiConfig,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl GeminiClient {
    /// Reads the api key from the environment variable named in the config.
    pub fn from_env(config: &AiConfig) -> Result<Self, AiError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                AiError::Auth(format!(
                    "environment variable {} is not set (export {}=<your key>)",
                    config.api_key_env, config.api_key_env
                ))
            })?;

        Self::new(config, api_key)
    }

    pub fn new(config: &AiConfig, api_key: String) -> Result<Self, AiError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AiError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(GeminiClient {
            config: config.clone(),
            api_key,
            client,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }
}

impl ModelClient for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let body = request_body(&self.config, prompt);

        info!(model = %self.config.model, prompt_bytes = prompt.len(), "calling model");

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    AiError::Network(format!("request timed out after {}s", self.config.timeout_secs))
                } else {
                    AiError::Network(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| AiError::Network(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(classify_status(status, &text));
        }

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| AiError::InvalidResponse(format!("response is not JSON: {e}")))?;
        let generated = extract_text(&value)?;

        debug!(response_bytes = generated.len(), "model responded");
        Ok(generated)
    }
}

pub fn request_body(config: &AiConfig, prompt: &str) -> Value {
    json!({
        "contents": [
            { "role": "user", "parts": [ { "text": prompt } ] }
        ],
        "generationConfig": {
            "temperature": config.temperature,
            "topP": config.top_p,
            "maxOutputTokens": config.max_output_tokens,
        }
    })
}

/// Maps a non-success status to the error taxonomy.
pub fn classify_status(status: StatusCode, body: &str) -> AiError {
    let message = error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AiError::Auth(message),
        StatusCode::TOO_MANY_REQUESTS => AiError::RateLimit(message),
        // an invalid key comes back as 400 INVALID_ARGUMENT with this reason
        StatusCode::BAD_REQUEST if body.contains("API_KEY_INVALID") => AiError::Auth(message),
        _ => AiError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Concatenates the text parts of the first candidate.
pub fn extract_text(response: &Value) -> Result<String, AiError> {
    let candidate = response
        .pointer("/candidates/0")
        .ok_or_else(|| match response.pointer("/promptFeedback/blockReason").and_then(Value::as_str) {
            Some(reason) => AiError::InvalidResponse(format!("prompt blocked: {reason}")),
            None => AiError::InvalidResponse("no candidates in response".into()),
        })?;

    let text: String = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate
            .get("finishReason")
            .and_then(Value::as_str)
            .unwrap_or("empty response");
        return Err(AiError::InvalidResponse(format!("candidate has no text ({reason})")));
    }

    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_auth_error() {
        let config = AiConfig {
            api_key_env: "PKGSCOPE_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..AiConfig::default()
        };
        assert!(matches!(GeminiClient::from_env(&config), Err(AiError::Auth(_))));
    }

    #[test]
    fn status_classification() {
        assert!(matches!(classify_status(StatusCode::UNAUTHORIZED, ""), AiError::Auth(_)));
        assert!(matches!(classify_status(StatusCode::FORBIDDEN, ""), AiError::Auth(_)));
        assert!(matches!(classify_status(StatusCode::TOO_MANY_REQUESTS, ""), AiError::RateLimit(_)));

        let invalid_key = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT", "details": [{"reason": "API_KEY_INVALID"}]}}"#;
        match classify_status(StatusCode::BAD_REQUEST, invalid_key) {
            AiError::Auth(message) => assert_eq!(message, "API key not valid."),
            other => panic!("expected auth error, got {other:?}"),
        }

        match classify_status(StatusCode::INTERNAL_SERVER_ERROR, "oops") {
            AiError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Internal Server Error");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn text_parts_are_joined() {
        let response = json!({
            "candidates": [{
                "content": { "parts": [ { "text": "{\"executive_summary\": " }, { "text": "\"ok\"}" } ] },
                "finishReason": "STOP"
            }]
        });
        assert_eq!(extract_text(&response).unwrap(), "{\"executive_summary\": \"ok\"}");
    }

    #[test]
    fn blocked_prompt_and_empty_candidate() {
        let blocked = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(matches!(extract_text(&blocked), Err(AiError::InvalidResponse(m)) if m.contains("SAFETY")));

        let empty = json!({ "candidates": [{ "content": { "parts": [] }, "finishReason": "MAX_TOKENS" }] });
        assert!(matches!(extract_text(&empty), Err(AiError::InvalidResponse(m)) if m.contains("MAX_TOKENS")));
    }

    #[test]
    fn body_carries_generation_config() {
        let body = request_body(&AiConfig::default(), "hello");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 8192);
    }
}
