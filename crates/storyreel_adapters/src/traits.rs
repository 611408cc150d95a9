//! Trait seams between the pipeline and the external services.

use async_trait::async_trait;
use storyreel_core::{StoryRequest, StorySpec};
use storyreel_error::StoryreelResult;

/// Generates a structured story specification from a request.
#[async_trait]
pub trait StorySpecGenerator: Send + Sync {
    /// Produce a validated story spec for the request.
    async fn generate_spec(&self, request: &StoryRequest) -> StoryreelResult<StorySpec>;
}

/// Generates a single illustration for a scene prompt.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Produce finished PNG bytes for the prompt, including any format
    /// conversion the downstream encoders require.
    async fn generate_png(&self, prompt: &str) -> StoryreelResult<Vec<u8>>;
}

/// Synthesizes narration audio from a script.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Produce encoded MP3 bytes for the text.
    async fn synthesize(&self, text: &str) -> StoryreelResult<Vec<u8>>;
}
