//! Error types for video rendering.

/// Error kinds for render operations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub enum RenderErrorKind {
    /// Remote render worker returned a failure status
    #[display("Render worker failed: {}", _0)]
    Worker(String),

    /// Remote worker response declared a non-video content type
    #[display("Render worker returned non-video content: {}", _0)]
    BadContentType(String),

    /// Rendered output failed the size sanity check
    #[display("Rendered artifact failed sanity check: {}", _0)]
    CorruptArtifact(String),

    /// Local encoder invocation failed; carries the encoder's stderr verbatim
    #[display("Encoder failed: {}", _0)]
    Encoder(String),

    /// A scene asset expected on disk was missing
    #[display("Missing scene asset: {}", _0)]
    MissingAsset(String),

    /// Filesystem operation failed during rendering
    #[display("Render I/O failed: {}", _0)]
    Io(String),
}

/// Error wrapper with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Render Error: {} at line {} in {}", kind, line, file)]
pub struct RenderError {
    /// The error kind
    pub kind: RenderErrorKind,
    /// Line number where error occurred
    pub line: u32,
    /// File where error occurred
    pub file: &'static str,
}

impl RenderError {
    /// Create a new RenderError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: RenderErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
