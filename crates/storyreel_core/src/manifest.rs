//! Structured upload manifest for the remote render worker.
//!
//! The worker receives one manifest entry per uploaded file so it never has
//! to parse scene ids back out of filenames.

use serde::{Deserialize, Serialize};

/// What a manifest entry's file contains.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AssetRole {
    /// Still image looped over the scene's duration.
    Image,
    /// Narration audio for the scene.
    Audio,
}

/// One `{id, role, filename}` record in the upload manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneManifestEntry {
    /// Scene the file belongs to.
    pub id: u32,
    /// Whether the file is the scene's image or audio.
    pub role: AssetRole,
    /// Filename used for the multipart part.
    pub filename: String,
}

impl SceneManifestEntry {
    /// Manifest entry for a scene's image, using the deterministic name the
    /// pipeline writes assets under.
    pub fn image(id: u32) -> Self {
        Self {
            id,
            role: AssetRole::Image,
            filename: format!("scene_{id}.png"),
        }
    }

    /// Manifest entry for a scene's audio.
    pub fn audio(id: u32) -> Self {
        Self {
            id,
            role: AssetRole::Audio,
            filename: format!("scene_{id}.mp3"),
        }
    }
}
