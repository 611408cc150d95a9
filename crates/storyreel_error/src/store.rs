//! Error types for the job state store.

/// Error kinds for job store operations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub enum StoreErrorKind {
    /// Key-value backend request failed
    #[display("Store request failed: {}", _0)]
    Http(String),

    /// Record could not be serialized or deserialized
    #[display("Store serialization failed: {}", _0)]
    Serialization(String),

    /// Operation addressed a job id the store has no record for
    #[display("Unknown job: {}", _0)]
    UnknownJob(String),
}

/// Error wrapper with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Store Error: {} at line {} in {}", kind, line, file)]
pub struct StoreError {
    /// The error kind
    pub kind: StoreErrorKind,
    /// Line number where error occurred
    pub line: u32,
    /// File where error occurred
    pub file: &'static str,
}

impl StoreError {
    /// Create a new StoreError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StoreErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
