use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::types::ChatMessage;

/// Something that answers a chat prompt with text.
///
/// A failure here never aborts an evaluation: the runner records the case as
/// unanswered and moves on.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Endpoint settings for an OpenAI-compatible chat completion API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Base URL up to (not including) `/chat/completions`
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
            temperature: 0.1,
            max_tokens: 150,
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Clone)]
pub struct ChatCompletionClient {
    client: Client,
    config: CompletionConfig,
    api_key: Option<String>,
}

impl ChatCompletionClient {
    /// Build a client, reading the API key from `config.api_key_env`.
    /// A missing key is allowed (local servers often need none).
    pub fn new(config: CompletionConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!(env = %config.api_key_env, "no API key set, sending unauthenticated requests");
        }
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: CompletionConfig, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, config, api_key })
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, messages: &[ChatMessage]) -> Value {
        json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        })
    }
}

#[async_trait]
impl CompletionService for ChatCompletionClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let mut request = self.client.post(self.endpoint()).json(&self.request_body(messages));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let resp = request.send().await.context("completion request failed")?;
        let status = resp.status();
        let body = resp.json::<Value>().await.context("completion response is not JSON")?;
        if !status.is_success() {
            anyhow::bail!("HTTP {}: {}", status.as_u16(), body);
        }
        response_text(&body)
    }
}

/// Text of the first choice in a chat completion response.
pub fn response_text(body: &Value) -> Result<String> {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("completion response has no choices[0].message.content"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_text() {
        let body = json!({
            "choices": [{ "message": { "role": "assistant", "content": "{\"conjugated_verb\": \"bhavati\"}" } }]
        });
        assert_eq!(response_text(&body).unwrap(), "{\"conjugated_verb\": \"bhavati\"}");
        assert!(response_text(&json!({ "choices": [] })).is_err());
        assert!(response_text(&json!({ "error": { "message": "rate limited" } })).is_err());
    }

    #[test]
    fn test_request_body_and_endpoint() {
        let config = CompletionConfig {
            base_url: "http://localhost:8000/v1/".to_string(),
            model: "sanskrit-small".to_string(),
            ..CompletionConfig::default()
        };
        let client = ChatCompletionClient::with_api_key(config, None).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8000/v1/chat/completions");

        let body = client.request_body(&[ChatMessage::user("bhū, laṭ")]);
        assert_eq!(body["model"], "sanskrit-small");
        assert_eq!(body["max_tokens"], 150);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "bhū, laṭ");
    }

    #[test]
    fn test_config_yaml_defaults() {
        let config: CompletionConfig = serde_yaml::from_str("model: o4-mini\n").unwrap();
        assert_eq!(config.model, "o4-mini");
        assert_eq!(config.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.temperature, 0.1);
    }
}
