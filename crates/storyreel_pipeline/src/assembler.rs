//! Per-scene asset generation.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use storyreel_adapters::{ImageGenerator, SpeechSynthesizer};
use storyreel_core::{Scene, SceneManifestEntry, StorySpec};
use storyreel_error::{
    PipelineError, PipelineErrorKind, StoryreelError, StoryreelResult, UpstreamError,
    UpstreamErrorKind,
};
use storyreel_store::JobStore;
use tokio::sync::Semaphore;

/// Generates the image and narration for every scene in a spec.
///
/// Scenes run under a concurrency bound with a pacing delay between
/// launches, so a burst of scenes does not burn through upstream quotas.
/// The first scene-level failure aborts the job: scenes that have not
/// started yet are skipped, and in-flight scenes are drained before the
/// error is returned so nothing is still writing when the working
/// directory is cleaned up.
#[derive(Clone)]
pub struct AssetAssembler {
    images: Arc<dyn ImageGenerator>,
    speech: Arc<dyn SpeechSynthesizer>,
    concurrency: usize,
    scene_delay: Duration,
}

impl AssetAssembler {
    /// Create an assembler over the given adapters.
    pub fn new(
        images: Arc<dyn ImageGenerator>,
        speech: Arc<dyn SpeechSynthesizer>,
        concurrency: usize,
        scene_delay: Duration,
    ) -> Self {
        Self {
            images,
            speech,
            concurrency: concurrency.max(1),
            scene_delay,
        }
    }

    /// Produce `scene_<id>.png` and `scene_<id>.mp3` in `workdir` for every
    /// scene, bumping the job's completed-scene counter as each finishes.
    #[tracing::instrument(skip(self, spec, workdir, store), fields(scenes = spec.scenes.len()))]
    pub async fn generate_assets(
        &self,
        job_id: &str,
        spec: &StorySpec,
        workdir: &Path,
        store: &Arc<dyn JobStore>,
    ) -> StoryreelResult<()> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let aborted = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(spec.scenes.len());

        for (index, scene) in spec.scenes_by_id().into_iter().enumerate() {
            if index > 0 && !self.scene_delay.is_zero() {
                tokio::time::sleep(self.scene_delay).await;
            }

            let scene_id = scene.id;
            let task = SceneTask {
                images: Arc::clone(&self.images),
                speech: Arc::clone(&self.speech),
                store: Arc::clone(store),
                job_id: job_id.to_string(),
                workdir: workdir.to_path_buf(),
                scene: scene.clone(),
            };
            let semaphore = Arc::clone(&semaphore);
            let aborted = Arc::clone(&aborted);

            handles.push((
                scene_id,
                tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.map_err(|_| {
                        StoryreelError::from(PipelineError::new(PipelineErrorKind::Io(
                            "scene semaphore closed".to_string(),
                        )))
                    })?;
                    if aborted.load(Ordering::SeqCst) {
                        return Ok(());
                    }
                    let result = task.run().await;
                    if result.is_err() {
                        aborted.store(true, Ordering::SeqCst);
                    }
                    result
                }),
            ));
        }

        let mut first_failure: Option<(u32, StoryreelError)> = None;
        for (scene_id, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(PipelineError::new(PipelineErrorKind::Io(format!(
                    "scene task panicked: {e}"
                )))
                .into()),
            };
            if let Err(e) = result {
                if first_failure.is_none() {
                    first_failure = Some((scene_id, e));
                }
            }
        }

        if let Some((scene_id, e)) = first_failure {
            Err(UpstreamError::new(UpstreamErrorKind::Generation(format!(
                "scene {scene_id}: {e}"
            ))))?;
        }
        Ok(())
    }
}

/// Everything one scene's generation needs, owned so it can be spawned.
struct SceneTask {
    images: Arc<dyn ImageGenerator>,
    speech: Arc<dyn SpeechSynthesizer>,
    store: Arc<dyn JobStore>,
    job_id: String,
    workdir: PathBuf,
    scene: Scene,
}

impl SceneTask {
    async fn run(self) -> StoryreelResult<()> {
        let scene_id = self.scene.id;
        tracing::debug!(scene = scene_id, "Generating scene assets");

        let png = self.images.generate_png(&self.scene.image_prompt).await?;
        write_asset(&self.workdir, &SceneManifestEntry::image(scene_id), &png).await?;

        let mp3 = self.speech.synthesize(&self.scene.audio_ssml).await?;
        write_asset(&self.workdir, &SceneManifestEntry::audio(scene_id), &mp3).await?;

        let completed = self.store.increment_scenes_completed(&self.job_id).await?;
        tracing::info!(scene = scene_id, completed, "Scene assets completed");
        Ok(())
    }
}

async fn write_asset(
    workdir: &Path,
    entry: &SceneManifestEntry,
    bytes: &[u8],
) -> StoryreelResult<()> {
    let path = workdir.join(&entry.filename);
    tokio::fs::write(&path, bytes).await.map_err(|e| {
        PipelineError::new(PipelineErrorKind::Io(format!("{}: {e}", path.display())))
    })?;
    Ok(())
}
