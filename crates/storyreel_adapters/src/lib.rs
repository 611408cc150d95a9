//! External service adapters.
//!
//! One adapter per third-party capability: story spec generation (chat
//! completion LLM), image generation (create-then-poll prediction service),
//! speech synthesis (TTS), and the remote render worker. Each wraps the
//! wire protocol with typed errors; retry policy lives inside the adapter
//! and is invisible to the orchestrator.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod image_client;
mod prompts;
mod render_worker;
mod spec_client;
mod speech_client;
mod traits;

pub use config::{has_all_keys, missing_keys};
pub use image_client::{ImageClientConfig, PredictionImageClient};
pub use prompts::{build_user_prompt, STORY_SCHEMA, SYSTEM_PROMPT};
pub use render_worker::{
    RenderUpload, RenderWorkerClient, RenderWorkerConfig, SceneUpload, MIN_ARTIFACT_BYTES,
};
pub use spec_client::{ChatCompletionSpecClient, SpecClientConfig};
pub use speech_client::{TtsClient, TtsConfig};
pub use traits::{ImageGenerator, SpeechSynthesizer, StorySpecGenerator};
