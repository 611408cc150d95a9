//! Job store trait definition.

use storyreel_core::{JobPatch, JobRecord};
use storyreel_error::StoryreelResult;

/// Trait for pluggable job state backends.
///
/// `update` is a merge: it sets the fields present in the patch and leaves
/// every other field untouched, because intermediate stages only know their
/// own fields. Counter increments are read-modify-write against the latest
/// stored value so concurrent scene completions never lose updates.
#[async_trait::async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a freshly created job record.
    async fn create(&self, record: JobRecord) -> StoryreelResult<()>;

    /// Fetch a record by job id; `None` if unknown or already reaped.
    async fn get(&self, job_id: &str) -> StoryreelResult<Option<JobRecord>>;

    /// Merge a partial update into the stored record.
    ///
    /// Returns `false` if the job id is unknown.
    async fn update(&self, job_id: &str, patch: JobPatch) -> StoryreelResult<bool>;

    /// Atomically bump the completed-scene counter, returning the new value.
    ///
    /// # Errors
    ///
    /// Returns `StoreErrorKind::UnknownJob` if the job id has no record;
    /// a counter bump against a reaped job is a pipeline inconsistency, not
    /// a no-op.
    async fn increment_scenes_completed(&self, job_id: &str) -> StoryreelResult<u32>;

    /// Reap a record after download or terminal failure cleanup.
    async fn remove(&self, job_id: &str) -> StoryreelResult<()>;
}
