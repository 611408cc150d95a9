//! Job records tracked by the job state store.

use crate::{StoryRequest, StorySpec};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lifecycle state of a job. Transitions are monotonic:
/// `Queued -> Running -> Succeeded | Failed`; terminal states are final.
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
pub enum JobStatus {
    /// Accepted and persisted, not yet picked up.
    Queued,
    /// The pipeline is executing a stage.
    Running,
    /// Final video produced and ready for download.
    Succeeded,
    /// A stage failed; the error field carries the reason.
    Failed,
}

impl JobStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// Progress observed by status pollers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    /// Label of the stage currently executing.
    pub current_step: String,

    /// Scenes whose assets have been fully produced.
    pub scenes_completed: u32,

    /// Total scene count, known once the spec is generated.
    pub total_scenes: u32,
}

/// Durable record of one job. Mutated only by the orchestrator, through
/// merge patches against the job state store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Opaque unique job token.
    pub job_id: String,

    /// Current lifecycle state.
    pub status: JobStatus,

    /// Human-readable failure reason; present only in the failed state.
    pub error: Option<String>,

    /// The originating request, copied at submission.
    pub request: StoryRequest,

    /// The generated story spec, once the spec stage completes.
    pub spec: Option<StorySpec>,

    /// Stage and per-scene progress counters.
    pub progress: JobProgress,

    /// Location of the final video once produced.
    pub final_path: Option<PathBuf>,

    /// Job-scoped scratch directory, recorded for cleanup.
    pub workdir: Option<PathBuf>,

    /// Submission timestamp.
    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    /// Create a fresh record in the queued state.
    pub fn queued(job_id: impl Into<String>, request: StoryRequest) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Queued,
            error: None,
            request,
            spec: None,
            progress: JobProgress::default(),
            final_path: None,
            workdir: None,
            created_at: Utc::now(),
        }
    }
}

/// Partial update applied to a stored job record.
///
/// Every field is optional; `apply` sets only the fields a stage knows
/// about and leaves the rest untouched. Intermediate stages never overwrite
/// each other's fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobPatch {
    /// New lifecycle state, if transitioning.
    pub status: Option<JobStatus>,
    /// Failure reason, if failing.
    pub error: Option<String>,
    /// Generated story spec, once the spec stage completes.
    pub spec: Option<StorySpec>,
    /// New stage label.
    pub current_step: Option<String>,
    /// Completed-scene counter value.
    pub scenes_completed: Option<u32>,
    /// Total scene count, once known.
    pub total_scenes: Option<u32>,
    /// Final artifact location, once produced.
    pub final_path: Option<PathBuf>,
    /// Working directory location, once allocated.
    pub workdir: Option<PathBuf>,
}

impl JobPatch {
    /// Merge this patch into a record, field by field.
    pub fn apply(&self, record: &mut JobRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(error) = &self.error {
            record.error = Some(error.clone());
        }
        if let Some(spec) = &self.spec {
            record.spec = Some(spec.clone());
        }
        if let Some(step) = &self.current_step {
            record.progress.current_step = step.clone();
        }
        if let Some(completed) = self.scenes_completed {
            record.progress.scenes_completed = completed;
        }
        if let Some(total) = self.total_scenes {
            record.progress.total_scenes = total;
        }
        if let Some(path) = &self.final_path {
            record.final_path = Some(path.clone());
        }
        if let Some(dir) = &self.workdir {
            record.workdir = Some(dir.clone());
        }
    }

    /// Patch that only transitions status.
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Patch that records a stage label.
    pub fn step(label: impl Into<String>) -> Self {
        Self {
            current_step: Some(label.into()),
            ..Self::default()
        }
    }
}
