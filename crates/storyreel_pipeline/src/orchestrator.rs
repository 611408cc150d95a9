//! The job orchestrator: submission, stage sequencing, status and download.

use crate::{workdir, AssetAssembler, ExecutionMode, PipelineConfig};
use std::path::Path;
use std::sync::Arc;
use storyreel_adapters::StorySpecGenerator;
use storyreel_core::{JobPatch, JobRecord, JobStatus, StoryRequest, StorySpec};
use storyreel_error::{PipelineError, PipelineErrorKind, StoryreelError, StoryreelResult};
use storyreel_render::RenderCoordinator;
use storyreel_store::JobStore;

/// Stage labels reported through the status endpoint.
mod step {
    pub const SPEC: &str = "spec";
    pub const ASSETS: &str = "assets";
    pub const RENDER: &str = "render";
    pub const DONE: &str = "done";
}

/// Drives jobs through the fixed stage sequence: spec generation, per-scene
/// assets, video render. All job state lives in the store; the orchestrator
/// itself is stateless and cheap to clone into spawned tasks.
#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn JobStore>,
    spec_generator: Arc<dyn StorySpecGenerator>,
    assembler: AssetAssembler,
    renderer: Arc<RenderCoordinator>,
    config: PipelineConfig,
}

impl Orchestrator {
    /// Assemble an orchestrator from its collaborators.
    pub fn new(
        store: Arc<dyn JobStore>,
        spec_generator: Arc<dyn StorySpecGenerator>,
        assembler: AssetAssembler,
        renderer: Arc<RenderCoordinator>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            spec_generator,
            assembler,
            renderer,
            config,
        }
    }

    /// Accept a request and start a job for it.
    ///
    /// In async mode the returned record is in the queued state and the
    /// pipeline runs in a spawned task; in sync mode the call returns the
    /// terminal record.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the request's required fields are
    /// missing, before any job state is created.
    #[tracing::instrument(skip(self, request))]
    pub async fn submit(&self, request: StoryRequest) -> StoryreelResult<JobRecord> {
        request.validate()?;

        let job_id = uuid::Uuid::new_v4().to_string();
        let record = JobRecord::queued(&job_id, request);
        self.store.create(record.clone()).await?;
        tracing::info!(job_id, mode = %self.config.execution_mode, "Job accepted");

        match self.config.execution_mode {
            ExecutionMode::Async => {
                let orchestrator = self.clone();
                let spawned_id = job_id.clone();
                tokio::spawn(async move {
                    if let Err(e) = orchestrator.run(&spawned_id).await {
                        tracing::error!(job_id = spawned_id, error = %e, "Job driver failed");
                    }
                });
                Ok(record)
            }
            ExecutionMode::Sync => {
                self.run(&job_id).await?;
                self.status(&job_id).await
            }
        }
    }

    /// Execute the stage sequence for a queued job.
    ///
    /// Stage failures and store faults alike are recorded on the job and are
    /// not errors of this function; the returned error covers only the
    /// initial record fetch and failure-path cleanup.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self, job_id: &str) -> StoryreelResult<()> {
        let record = self.status(job_id).await?;
        let request = record.request;

        if let Err(e) = self
            .store
            .update(
                job_id,
                JobPatch {
                    status: Some(JobStatus::Running),
                    current_step: Some(step::SPEC.to_string()),
                    ..JobPatch::default()
                },
            )
            .await
        {
            return self.fail(job_id, None, e).await;
        }

        let dir = match workdir::create(&self.config.workdir_root, job_id).await {
            Ok(dir) => dir,
            Err(e) => return self.fail(job_id, None, e).await,
        };

        match self.execute_stages(job_id, &request, &dir).await {
            Ok(()) => {
                tracing::info!(job_id, "Job succeeded");
                Ok(())
            }
            Err(e) => self.fail(job_id, Some(&dir), e).await,
        }
    }

    /// The stage sequence proper: spec generation, per-scene assets, render,
    /// terminal status write. Any error here is a job failure.
    async fn execute_stages(
        &self,
        job_id: &str,
        request: &StoryRequest,
        dir: &Path,
    ) -> StoryreelResult<()> {
        self.store
            .update(
                job_id,
                JobPatch {
                    workdir: Some(dir.to_path_buf()),
                    ..JobPatch::default()
                },
            )
            .await?;

        let spec = self.spec_generator.generate_spec(request).await?;
        persist_spec(dir, &spec).await?;
        self.store
            .update(
                job_id,
                JobPatch {
                    spec: Some(spec.clone()),
                    total_scenes: Some(spec.scenes.len() as u32),
                    current_step: Some(step::ASSETS.to_string()),
                    ..JobPatch::default()
                },
            )
            .await?;

        self.assembler
            .generate_assets(job_id, &spec, dir, &self.store)
            .await?;

        self.store
            .update(job_id, JobPatch::step(step::RENDER))
            .await?;
        let final_path = self.renderer.render(&spec, dir).await?;

        self.store
            .update(
                job_id,
                JobPatch {
                    status: Some(JobStatus::Succeeded),
                    current_step: Some(step::DONE.to_string()),
                    final_path: Some(final_path),
                    ..JobPatch::default()
                },
            )
            .await?;
        Ok(())
    }

    /// Fetch the current record for a job.
    ///
    /// # Errors
    ///
    /// Returns `PipelineErrorKind::NotFound` for unknown or reaped job ids.
    pub async fn status(&self, job_id: &str) -> StoryreelResult<JobRecord> {
        self.store.get(job_id).await?.ok_or_else(|| {
            PipelineError::new(PipelineErrorKind::NotFound(job_id.to_string())).into()
        })
    }

    /// Hand over the final video and release the job's resources.
    ///
    /// The bytes are read fully into memory before the working directory is
    /// deleted and the record reaped, so the handover never races its own
    /// cleanup. A second download of the same job id reports not-found.
    ///
    /// # Errors
    ///
    /// Returns `PipelineErrorKind::NotFound` for unknown job ids and
    /// `PipelineErrorKind::NotReady` when the job has not succeeded.
    #[tracing::instrument(skip(self))]
    pub async fn download(&self, job_id: &str) -> StoryreelResult<(Vec<u8>, String)> {
        let record = self.status(job_id).await?;
        if record.status != JobStatus::Succeeded {
            Err(PipelineError::new(PipelineErrorKind::NotReady(format!(
                "job {job_id} is {}",
                record.status
            ))))?;
        }
        let final_path = record.final_path.ok_or_else(|| {
            PipelineError::new(PipelineErrorKind::NotReady(format!(
                "job {job_id} has no final video recorded"
            )))
        })?;

        let bytes = tokio::fs::read(&final_path).await.map_err(|e| {
            PipelineError::new(PipelineErrorKind::Io(format!(
                "{}: {e}",
                final_path.display()
            )))
        })?;

        if let Some(dir) = &record.workdir {
            workdir::remove(dir).await?;
        }
        self.store.remove(job_id).await?;
        tracing::info!(job_id, bytes = bytes.len(), "Job downloaded and reaped");

        Ok((bytes, format!("social-story-{job_id}.mp4")))
    }

    /// Record a stage failure and release the working directory immediately.
    ///
    /// The status write is best-effort: when the store itself is the thing
    /// that failed, the directory still has to go.
    async fn fail(
        &self,
        job_id: &str,
        dir: Option<&Path>,
        error: StoryreelError,
    ) -> StoryreelResult<()> {
        tracing::error!(job_id, error = %error, "Job failed");
        let recorded = self
            .store
            .update(
                job_id,
                JobPatch {
                    status: Some(JobStatus::Failed),
                    error: Some(error.to_string()),
                    ..JobPatch::default()
                },
            )
            .await;
        if let Err(store_err) = recorded {
            tracing::error!(job_id, error = %store_err, "Could not record job failure");
        }
        if let Some(dir) = dir {
            workdir::remove(dir).await?;
        }
        Ok(())
    }
}

/// Keep the generated spec alongside the assets it produced, for debugging
/// failed renders before the directory is cleaned up.
async fn persist_spec(dir: &Path, spec: &StorySpec) -> StoryreelResult<()> {
    let path = dir.join("story_spec.json");
    let json = serde_json::to_vec_pretty(spec).map_err(|e| {
        PipelineError::new(PipelineErrorKind::Io(format!("{}: {e}", path.display())))
    })?;
    tokio::fs::write(&path, json).await.map_err(|e| {
        PipelineError::new(PipelineErrorKind::Io(format!("{}: {e}", path.display())))
    })?;
    Ok(())
}
