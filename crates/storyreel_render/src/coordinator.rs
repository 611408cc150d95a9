//! The render coordinator: remote-first with local fallback.

use crate::build_srt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storyreel_adapters::{RenderUpload, RenderWorkerClient, SceneUpload, MIN_ARTIFACT_BYTES};
use storyreel_core::StorySpec;
use storyreel_error::{RenderError, RenderErrorKind, StoryreelResult};

/// The local rendering strategy, behind a trait so the coordinator's
/// fallback logic can be exercised without an encoder binary.
#[async_trait::async_trait]
pub trait LocalRenderer: Send + Sync {
    /// Render the final video from the assets in `workdir`, burning in the
    /// subtitle file at `srt_path`. Returns the final video path.
    async fn render(
        &self,
        spec: &StorySpec,
        workdir: &Path,
        srt_path: &Path,
    ) -> StoryreelResult<PathBuf>;
}

/// Produces the final video for a job, trying the remote render worker
/// first and falling back to local encoding on any worker failure. The
/// worker is never retried; local encoding failures are fatal to the job.
pub struct RenderCoordinator {
    worker: RenderWorkerClient,
    local: Arc<dyn LocalRenderer>,
}

impl RenderCoordinator {
    /// Create a coordinator from a worker client and a local strategy.
    pub fn new(worker: RenderWorkerClient, local: Arc<dyn LocalRenderer>) -> Self {
        Self { worker, local }
    }

    /// Render the job's final video into `workdir/final.mp4`.
    #[tracing::instrument(skip(self, spec, workdir), fields(scenes = spec.scenes.len()))]
    pub async fn render(&self, spec: &StorySpec, workdir: &Path) -> StoryreelResult<PathBuf> {
        let srt_path = workdir.join("story.srt");
        tokio::fs::write(&srt_path, build_srt(spec)).await.map_err(|e| {
            RenderError::new(RenderErrorKind::Io(format!("{}: {e}", srt_path.display())))
        })?;

        if self.worker.is_configured() {
            match self.render_remote(spec, workdir, &srt_path).await {
                Ok(path) => return Ok(path),
                Err(e) => {
                    tracing::warn!(error = %e, "Render worker failed, falling back to local encoding");
                }
            }
        } else {
            tracing::debug!("No render worker configured, using local encoding");
        }

        let final_path = self.local.render(spec, workdir, &srt_path).await?;
        validate_artifact(&final_path).await?;
        Ok(final_path)
    }

    async fn render_remote(
        &self,
        spec: &StorySpec,
        workdir: &Path,
        srt_path: &Path,
    ) -> StoryreelResult<PathBuf> {
        let srt = tokio::fs::read(srt_path).await.map_err(|e| {
            RenderError::new(RenderErrorKind::Io(format!("{}: {e}", srt_path.display())))
        })?;

        let mut scenes = Vec::new();
        for scene in spec.scenes_by_id() {
            let image_path = workdir.join(format!("scene_{}.png", scene.id));
            let audio_path = workdir.join(format!("scene_{}.mp3", scene.id));
            let image = tokio::fs::read(&image_path).await.map_err(|e| {
                RenderError::new(RenderErrorKind::MissingAsset(format!(
                    "scene {}: {e}",
                    scene.id
                )))
            })?;
            let audio = tokio::fs::read(&audio_path).await.map_err(|e| {
                RenderError::new(RenderErrorKind::MissingAsset(format!(
                    "scene {}: {e}",
                    scene.id
                )))
            })?;
            scenes.push(SceneUpload {
                id: scene.id,
                duration_sec: scene.duration_sec,
                image,
                audio,
            });
        }

        let video = self.worker.render(&RenderUpload { srt, scenes }).await?;

        let final_path = workdir.join("final.mp4");
        tokio::fs::write(&final_path, &video).await.map_err(|e| {
            RenderError::new(RenderErrorKind::Io(format!("{}: {e}", final_path.display())))
        })?;
        Ok(final_path)
    }
}

/// Accept the final artifact only if its byte size is non-trivial.
async fn validate_artifact(path: &Path) -> StoryreelResult<()> {
    let size = tokio::fs::metadata(path)
        .await
        .map(|m| m.len())
        .unwrap_or(0);
    if size <= MIN_ARTIFACT_BYTES as u64 {
        Err(RenderError::new(RenderErrorKind::CorruptArtifact(format!(
            "final video is only {size} bytes"
        ))))?;
    }
    Ok(())
}
