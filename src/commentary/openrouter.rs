//! OpenRouter commentary provider.
//!
//! Routes commentary through OpenRouter's unified API using the
//! OpenAI-compatible chat completions format, so any hosted model
//! (Gemini, Claude, GPT) can be selected by name in config.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use super::{system_prompt, CommentaryService};

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";
const DEFAULT_MAX_TOKENS: u32 = 1024;

// ---------------------------------------------------------------------------
// API types (OpenAI-compatible)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChatMessage>,
}

impl ChatResponse {
    fn text(&self) -> String {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct OpenRouterClient {
    http: Client,
    api_key: SecretString,
    model: String,
    max_tokens: u32,
    total_calls: AtomicU64,
}

impl OpenRouterClient {
    /// Create a new OpenRouter client.
    ///
    /// - `api_key`: OpenRouter API key.
    /// - `model`: Model ID (e.g. "google/gemini-2.5-flash").
    /// - `max_tokens`: Max output tokens per request.
    /// - `timeout_secs`: Whole-request timeout.
    pub fn new(
        api_key: SecretString,
        model: Option<String>,
        max_tokens: Option<u32>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build OpenRouter HTTP client")?;

        Ok(Self {
            http,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            total_calls: AtomicU64::new(0),
        })
    }

    fn build_request(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt().to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
        }
    }

    /// Total number of API calls made.
    pub fn total_calls(&self) -> u64 {
        self.total_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CommentaryService for OpenRouterClient {
    async fn comment(&self, prompt: &str) -> Result<String> {
        let request = self.build_request(prompt);
        debug!(model = %self.model, "Requesting commentary via OpenRouter");

        self.total_calls.fetch_add(1, Ordering::Relaxed);
        let response = self
            .http
            .post(OPENROUTER_API_URL)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .header("X-Title", "Price Ladder")
            .json(&request)
            .send()
            .await
            .context("OpenRouter request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "OpenRouter API error {status} (model={}): {error_text}",
                self.model
            );
        }

        let body: ChatResponse = response
            .json()
            .await
            .context("Failed to parse OpenRouter response")?;
        Ok(body.text())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_defaults() {
        let c = OpenRouterClient::new(SecretString::new("k".into()), None, None, 30).unwrap();
        assert_eq!(c.model_name(), DEFAULT_MODEL);
        assert_eq!(c.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(c.total_calls(), 0);
    }

    #[test]
    fn test_request_has_system_then_user() {
        let c = OpenRouterClient::new(SecretString::new("k".into()), None, None, 30).unwrap();
        let json = serde_json::to_value(c.build_request("ladder")).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "ladder");
    }

    #[test]
    fn test_response_text_first_choice() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"Looks fine."}}]}"#,
        )
        .unwrap();
        assert_eq!(body.text(), "Looks fine.");
    }

    #[test]
    fn test_response_no_choices_is_empty() {
        let body: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(body.text(), "");
    }
}
