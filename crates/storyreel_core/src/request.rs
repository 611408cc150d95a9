//! The caller-supplied story request.

use serde::{Deserialize, Serialize};
use storyreel_error::{StoryreelResult, ValidationError};

/// Parameters for one story generation request.
///
/// Immutable once submitted; the orchestrator copies it into the job and the
/// caller never mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryRequest {
    /// Age of the child the story is written for.
    #[serde(default = "default_age")]
    pub age: u8,

    /// Reading level label passed through to the prompt.
    #[serde(default = "default_reading_level")]
    pub reading_level: String,

    /// High-level diagnosis summary; no identifying detail expected.
    #[serde(default = "default_diagnosis_summary")]
    pub diagnosis_summary: String,

    /// The situation the story prepares the child for. Required.
    pub situation: String,

    /// The setting the situation takes place in. Required.
    pub setting: String,

    /// Words the generated script must not use.
    #[serde(default)]
    pub words_to_avoid: Vec<String>,

    /// Voice preset label for speech synthesis.
    #[serde(default = "default_voice_preset")]
    pub voice_preset: String,
}

fn default_age() -> u8 {
    6
}

fn default_reading_level() -> String {
    "early_reader".to_string()
}

fn default_diagnosis_summary() -> String {
    "autism; prefers routine".to_string()
}

fn default_voice_preset() -> String {
    "calm_childlike_female".to_string()
}

impl StoryRequest {
    /// Check the required fields are present.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if `situation` or `setting` is empty.
    pub fn validate(&self) -> StoryreelResult<()> {
        if self.situation.trim().is_empty() {
            Err(ValidationError::new("situation is required"))?;
        }
        if self.setting.trim().is_empty() {
            Err(ValidationError::new("setting is required"))?;
        }
        Ok(())
    }
}
