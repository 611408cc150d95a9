//! Error types for the pipeline orchestrator.

/// Error kinds for job lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub enum PipelineErrorKind {
    /// Job id is unknown
    #[display("Job not found: {}", _0)]
    NotFound(String),

    /// Result was requested before the job reached the succeeded state
    #[display("Job not ready: {}", _0)]
    NotReady(String),

    /// Filesystem operation on the working directory failed
    #[display("Pipeline I/O failed: {}", _0)]
    Io(String),
}

/// Error wrapper with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Pipeline Error: {} at line {} in {}", kind, line, file)]
pub struct PipelineError {
    /// The error kind
    pub kind: PipelineErrorKind,
    /// Line number where error occurred
    pub line: u32,
    /// File where error occurred
    pub file: &'static str,
}

impl PipelineError {
    /// Create a new PipelineError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PipelineErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
