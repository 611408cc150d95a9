//! Job-scoped scratch directories.
//!
//! Every job gets exactly one working directory under the configured root.
//! It is released exactly once: immediately when the job fails, or after the
//! final video's bytes have been fully read during download.

use std::path::{Path, PathBuf};
use storyreel_error::{PipelineError, PipelineErrorKind, StoryreelResult};

/// Create the working directory for a job, including missing parents.
pub(crate) async fn create(root: &Path, job_id: &str) -> StoryreelResult<PathBuf> {
    let path = root.join(job_id);
    tokio::fs::create_dir_all(&path).await.map_err(|e| {
        PipelineError::new(PipelineErrorKind::Io(format!("{}: {e}", path.display())))
    })?;
    tracing::debug!(path = %path.display(), "Created working directory");
    Ok(path)
}

/// Delete a job's working directory and everything in it.
///
/// A directory that is already gone is not an error, so cleanup paths can
/// call this without tracking whether an earlier stage got there first.
pub(crate) async fn remove(path: &Path) -> StoryreelResult<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Removed working directory");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PipelineError::new(PipelineErrorKind::Io(format!(
            "{}: {e}",
            path.display()
        ))))?,
    }
}
