//! In-process job store.

use crate::JobStore;
use std::collections::HashMap;
use storyreel_core::{JobPatch, JobRecord};
use storyreel_error::{StoreError, StoreErrorKind, StoryreelResult};
use tokio::sync::RwLock;

/// In-memory job store backed by a `HashMap` behind an async `RwLock`.
///
/// Merge updates and counter increments run entirely under the write lock,
/// so interleaved partial updates from concurrent scene tasks are applied
/// against the latest stored record.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<String, JobRecord>>,
}

impl MemoryJobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, record: JobRecord) -> StoryreelResult<()> {
        let mut jobs = self.jobs.write().await;
        jobs.insert(record.job_id.clone(), record);
        Ok(())
    }

    async fn get(&self, job_id: &str) -> StoryreelResult<Option<JobRecord>> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(job_id).cloned())
    }

    async fn update(&self, job_id: &str, patch: JobPatch) -> StoryreelResult<bool> {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(job_id) {
            Some(record) => {
                patch.apply(record);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn increment_scenes_completed(&self, job_id: &str) -> StoryreelResult<u32> {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(job_id) {
            Some(record) => {
                record.progress.scenes_completed += 1;
                Ok(record.progress.scenes_completed)
            }
            None => Err(StoreError::new(StoreErrorKind::UnknownJob(
                job_id.to_string(),
            )))?,
        }
    }

    async fn remove(&self, job_id: &str) -> StoryreelResult<()> {
        let mut jobs = self.jobs.write().await;
        jobs.remove(job_id);
        Ok(())
    }
}
