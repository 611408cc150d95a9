//! Client for the remote render worker.

use reqwest::multipart::{Form, Part};
use storyreel_core::SceneManifestEntry;
use storyreel_error::{RenderError, RenderErrorKind, StoryreelResult};

/// Minimum plausible size for a rendered video. Bodies at or below this are
/// treated as corrupt.
pub const MIN_ARTIFACT_BYTES: usize = 1024;

/// Configuration for the render worker client.
#[derive(Debug, Clone)]
pub struct RenderWorkerConfig {
    /// Base URL of the render worker. `None` disables the remote strategy.
    pub worker_url: Option<String>,
    /// Upload/download timeout in seconds.
    pub timeout_secs: u64,
}

impl RenderWorkerConfig {
    /// Read configuration from the environment.
    ///
    /// Reads `RENDER_WORKER_URL`; empty or unset disables the remote
    /// strategy and the coordinator goes straight to local encoding.
    pub fn from_env() -> Self {
        let worker_url = std::env::var("RENDER_WORKER_URL")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        Self {
            worker_url,
            timeout_secs: 300,
        }
    }
}

/// One scene's upload payload.
#[derive(Debug, Clone)]
pub struct SceneUpload {
    /// Scene id.
    pub id: u32,
    /// Target clip length in seconds.
    pub duration_sec: u32,
    /// PNG bytes.
    pub image: Vec<u8>,
    /// MP3 bytes.
    pub audio: Vec<u8>,
}

/// Complete upload for one render request, scenes in ascending id order.
#[derive(Debug, Clone)]
pub struct RenderUpload {
    /// SRT subtitle file contents.
    pub srt: Vec<u8>,
    /// Per-scene assets.
    pub scenes: Vec<SceneUpload>,
}

/// Client for the remote render worker's multipart protocol.
///
/// The upload carries the subtitle file, each scene's image and audio, a
/// `scenes` form field with the `{id, duration_sec}` array, and a
/// `manifest` form field of `{id, role, filename}` records so the worker
/// never parses scene ids out of filenames.
#[derive(Debug, Clone)]
pub struct RenderWorkerClient {
    config: RenderWorkerConfig,
    client: reqwest::Client,
}

impl RenderWorkerClient {
    /// Create a new worker client.
    pub fn new(config: RenderWorkerConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    /// Whether a worker URL is configured.
    pub fn is_configured(&self) -> bool {
        self.config.worker_url.is_some()
    }

    fn build_form(upload: &RenderUpload) -> StoryreelResult<Form> {
        let mut manifest = Vec::new();
        let mut durations = Vec::new();
        let mut form = Form::new().part(
            "subs",
            Part::bytes(upload.srt.clone())
                .file_name("story.srt")
                .mime_str("application/x-subrip")
                .map_err(|e| RenderError::new(RenderErrorKind::Worker(e.to_string())))?,
        );

        for scene in &upload.scenes {
            let image_entry = SceneManifestEntry::image(scene.id);
            let audio_entry = SceneManifestEntry::audio(scene.id);

            form = form.part(
                "files",
                Part::bytes(scene.image.clone())
                    .file_name(image_entry.filename.clone())
                    .mime_str("image/png")
                    .map_err(|e| RenderError::new(RenderErrorKind::Worker(e.to_string())))?,
            );
            form = form.part(
                "files",
                Part::bytes(scene.audio.clone())
                    .file_name(audio_entry.filename.clone())
                    .mime_str("audio/mpeg")
                    .map_err(|e| RenderError::new(RenderErrorKind::Worker(e.to_string())))?,
            );

            manifest.push(image_entry);
            manifest.push(audio_entry);
            durations.push(serde_json::json!({
                "id": scene.id,
                "duration_sec": scene.duration_sec,
            }));
        }

        let manifest_json = serde_json::to_string(&manifest)
            .map_err(|e| RenderError::new(RenderErrorKind::Worker(e.to_string())))?;
        let durations_json = serde_json::to_string(&durations)
            .map_err(|e| RenderError::new(RenderErrorKind::Worker(e.to_string())))?;

        Ok(form
            .text("manifest", manifest_json)
            .text("scenes", durations_json))
    }

    /// Submit the upload and return the rendered video bytes.
    ///
    /// # Errors
    ///
    /// Any of these is a failure the caller should treat as "fall back to
    /// local encoding": transport error, non-2xx status, a content type
    /// other than `video/mp4`, or a body at or under the minimum size.
    #[tracing::instrument(skip(self, upload), fields(scenes = upload.scenes.len()))]
    pub async fn render(&self, upload: &RenderUpload) -> StoryreelResult<Vec<u8>> {
        let worker_url = self.config.worker_url.as_ref().ok_or_else(|| {
            RenderError::new(RenderErrorKind::Worker("no worker URL configured".to_string()))
        })?;

        let form = Self::build_form(upload)?;
        let response = self
            .client
            .post(format!("{worker_url}/render"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                RenderError::new(RenderErrorKind::Worker(format!("upload failed: {e}")))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RenderError::new(RenderErrorKind::Worker(format!(
                "worker returned {status}: {detail}"
            )))
            .into());
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.to_lowercase().contains("video/mp4") {
            Err(RenderError::new(RenderErrorKind::BadContentType(
                content_type,
            )))?;
        }

        let bytes = response.bytes().await.map_err(|e| {
            RenderError::new(RenderErrorKind::Worker(format!("body read failed: {e}")))
        })?;

        if bytes.len() <= MIN_ARTIFACT_BYTES {
            Err(RenderError::new(RenderErrorKind::CorruptArtifact(format!(
                "worker video is only {} bytes",
                bytes.len()
            ))))?;
        }

        tracing::info!(size = bytes.len(), "Received video from render worker");
        Ok(bytes.to_vec())
    }
}
