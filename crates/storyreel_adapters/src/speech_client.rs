//! Speech synthesis via a text-to-speech HTTP API.

use crate::SpeechSynthesizer;
use serde_json::json;
use storyreel_error::{ConfigError, StoryreelResult, UpstreamError, UpstreamErrorKind};
use tokio_retry2::{strategy::jitter, strategy::ExponentialBackoff, Retry, RetryError};

/// Configuration for the TTS client.
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// Base URL of the TTS API.
    pub base_url: String,
    /// API key sent in the `xi-api-key` header.
    pub api_key: String,
    /// Voice identifier.
    pub voice_id: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum retry attempts for rate-limited requests.
    pub max_retries: usize,
    /// Initial backoff delay in milliseconds.
    pub initial_backoff_ms: u64,
}

impl TtsConfig {
    /// Read configuration from the environment.
    ///
    /// Reads:
    /// - `ELEVENLABS_API_KEY` (required)
    /// - `ELEVENLABS_VOICE_ID` (required)
    /// - `ELEVENLABS_BASE_URL` (default: "https://api.elevenlabs.io")
    pub fn from_env() -> StoryreelResult<Self> {
        let api_key = std::env::var("ELEVENLABS_API_KEY")
            .map_err(|_| ConfigError::new("ELEVENLABS_API_KEY not set"))?;
        let voice_id = std::env::var("ELEVENLABS_VOICE_ID")
            .map_err(|_| ConfigError::new("ELEVENLABS_VOICE_ID not set"))?;
        let base_url = std::env::var("ELEVENLABS_BASE_URL")
            .unwrap_or_else(|_| "https://api.elevenlabs.io".to_string());
        Ok(Self {
            base_url,
            api_key,
            voice_id,
            timeout_secs: 60,
            max_retries: 4,
            initial_backoff_ms: 2000,
        })
    }
}

/// Speech synthesizer backed by an ElevenLabs-style TTS API.
///
/// Rate-limit responses (429) are retried with exponential backoff and
/// jitter, up to a bounded number of attempts. Every other error class
/// fails immediately.
#[derive(Debug, Clone)]
pub struct TtsClient {
    config: TtsConfig,
    client: reqwest::Client,
}

impl TtsClient {
    /// Create a new TTS client.
    pub fn new(config: TtsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    async fn synthesize_once(&self, text: &str) -> Result<Vec<u8>, UpstreamError> {
        let url = format!(
            "{}/v1/text-to-speech/{}",
            self.config.base_url, self.config.voice_id
        );
        let body = json!({
            "text": text,
            "model_id": "eleven_multilingual_v2",
            "voice_settings": {"stability": 0.5, "similarity_boost": 0.75},
            "output_format": "mp3_22050_32",
        });

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                UpstreamError::new(UpstreamErrorKind::Http(format!("tts request: {e}")))
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let detail = response.text().await.unwrap_or_default();
            return Err(UpstreamError::new(UpstreamErrorKind::RateLimited(format!(
                "tts rate limited: {detail}"
            ))));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(UpstreamError::new(UpstreamErrorKind::Api(format!(
                "tts failed {status}: {detail}"
            ))));
        }

        let bytes = response.bytes().await.map_err(|e| {
            UpstreamError::new(UpstreamErrorKind::Http(format!("tts body: {e}")))
        })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for TtsClient {
    #[tracing::instrument(skip(self, text), fields(chars = text.len()))]
    async fn synthesize(&self, text: &str) -> StoryreelResult<Vec<u8>> {
        let retry_strategy = ExponentialBackoff::from_millis(self.config.initial_backoff_ms)
            .factor(2)
            .max_delay(std::time::Duration::from_secs(60))
            .map(jitter)
            .take(self.config.max_retries);

        let bytes = Retry::spawn(retry_strategy, || async {
            match self.synthesize_once(text).await {
                Ok(bytes) => Ok(bytes),
                Err(e) if e.kind.is_retryable() => {
                    tracing::warn!(error = %e, "TTS rate limited, will retry");
                    Err(RetryError::Transient {
                        err: e,
                        retry_after: None,
                    })
                }
                Err(e) => Err(RetryError::Permanent(e)),
            }
        })
        .await?;

        Ok(bytes)
    }
}
