//! Story spec generation via a chat-completions LLM endpoint.

use crate::{build_user_prompt, StorySpecGenerator, SYSTEM_PROMPT};
use serde::Deserialize;
use serde_json::json;
use storyreel_core::{StoryRequest, StorySpec};
use storyreel_error::{
    ConfigError, StoryreelResult, UpstreamError, UpstreamErrorKind, ValidationError,
};

/// Configuration for the chat-completions spec client.
#[derive(Debug, Clone)]
pub struct SpecClientConfig {
    /// Base URL of the chat-completions API.
    pub base_url: String,
    /// API key sent as a Bearer token.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl SpecClientConfig {
    /// Read configuration from the environment.
    ///
    /// Reads:
    /// - `OPENAI_API_KEY` (required)
    /// - `OPENAI_BASE_URL` (default: "https://api.openai.com")
    /// - `OPENAI_MODEL` (default: "gpt-4o-mini")
    pub fn from_env() -> StoryreelResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::new("OPENAI_API_KEY not set"))?;
        let base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com".to_string());
        let model =
            std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        Ok(Self {
            base_url,
            api_key,
            model,
            timeout_secs: 60,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Spec generator backed by an OpenAI-compatible chat-completions API.
#[derive(Debug, Clone)]
pub struct ChatCompletionSpecClient {
    config: SpecClientConfig,
    client: reqwest::Client,
}

impl ChatCompletionSpecClient {
    /// Create a new spec client.
    pub fn new(config: SpecClientConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }
}

#[async_trait::async_trait]
impl StorySpecGenerator for ChatCompletionSpecClient {
    #[tracing::instrument(skip(self, request), fields(model = %self.config.model))]
    async fn generate_spec(&self, request: &StoryRequest) -> StoryreelResult<StorySpec> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);
        let body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": build_user_prompt(request)},
            ],
            "temperature": 0.4,
            "response_format": {"type": "json_object"},
        });

        tracing::debug!("Requesting story spec");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                UpstreamError::new(UpstreamErrorKind::Http(format!("spec request: {e}")))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(UpstreamError::new(UpstreamErrorKind::Api(format!(
                "spec generation failed {status}: {detail}"
            )))
            .into());
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            UpstreamError::new(UpstreamErrorKind::Deserialization(format!(
                "spec response: {e}"
            )))
        })?;

        let content = completion
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| ValidationError::new("spec response contained no choices"))?;

        let spec = StorySpec::from_json(content)?;
        tracing::info!(scenes = spec.scenes.len(), "Story spec generated");
        Ok(spec)
    }
}
