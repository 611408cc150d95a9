//! The generated story specification.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use storyreel_error::{StoryreelResult, ValidationError};

/// One narrated beat of the story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    /// Scene identifier; unique within a spec, used to join image, audio and
    /// video artifacts across the pipeline.
    pub id: u32,

    /// Short statement of what the scene teaches.
    pub goal: String,

    /// Spoken narration text.
    pub script: String,

    /// On-screen caption, also the source of the subtitle track.
    pub on_screen_text: String,

    /// Prompt handed to the image generation service.
    pub image_prompt: String,

    /// Target clip length in whole seconds. Clamped to 1..=60 after parsing.
    #[serde(deserialize_with = "coerce_duration")]
    pub duration_sec: u32,

    /// Speech-markup variant of the script.
    pub audio_ssml: String,
}

/// Clamp duration to one scene-plausible minute. The generator occasionally
/// emits zero, negative or absurdly large durations, which the encoders
/// cannot handle.
fn coerce_duration<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = i64::deserialize(deserializer)?;
    Ok(raw.clamp(1, 60) as u32)
}

/// A complete generated story: ordered scenes plus global metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorySpec {
    /// Generator-supplied metadata (title, language, visual guidelines).
    pub meta: serde_json::Value,

    /// The story scenes.
    pub scenes: Vec<Scene>,

    /// Gentle encouragement shown at the end of the story.
    pub closing_affirmation: String,
}

impl StorySpec {
    /// Parse a spec from the generation service's raw JSON response.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the JSON does not match the schema,
    /// contains no scenes, or reuses a scene id.
    pub fn from_json(raw: &str) -> StoryreelResult<Self> {
        let spec: StorySpec = serde_json::from_str(raw)
            .map_err(|e| ValidationError::new(format!("story spec does not match schema: {e}")))?;
        spec.validate()?;
        Ok(spec)
    }

    /// Check structural invariants: at least one scene, unique scene ids.
    pub fn validate(&self) -> StoryreelResult<()> {
        if self.scenes.is_empty() {
            Err(ValidationError::new("story spec has no scenes"))?;
        }
        let mut seen = HashSet::new();
        for scene in &self.scenes {
            if !seen.insert(scene.id) {
                Err(ValidationError::new(format!(
                    "duplicate scene id {} in story spec",
                    scene.id
                )))?;
            }
        }
        Ok(())
    }

    /// Scenes in ascending id order, independent of generation order.
    pub fn scenes_by_id(&self) -> Vec<&Scene> {
        let mut scenes: Vec<&Scene> = self.scenes.iter().collect();
        scenes.sort_by_key(|s| s.id);
        scenes
    }

    /// Total story length in seconds.
    pub fn total_duration_secs(&self) -> u32 {
        self.scenes.iter().map(|s| s.duration_sec).sum()
    }
}
