//! Error types for external service adapters.

/// Error kinds for calls to external AI services.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub enum UpstreamErrorKind {
    /// Transport-level failure (connection refused, DNS, TLS)
    #[display("HTTP request failed: {}", _0)]
    Http(String),

    /// Service returned a non-success status
    #[display("API error: {}", _0)]
    Api(String),

    /// Service refused the request for quota reasons
    #[display("Rate limited: {}", _0)]
    RateLimited(String),

    /// Failed to deserialize a service response
    #[display("Failed to deserialize response: {}", _0)]
    Deserialization(String),

    /// Polling for a prediction exceeded the wall-clock ceiling
    #[display("Polling timed out: {}", _0)]
    PollTimeout(String),

    /// Generation reached a terminal failure state upstream
    #[display("Generation failed: {}", _0)]
    Generation(String),
}

impl UpstreamErrorKind {
    /// Returns true if this error should trigger a retry with backoff.
    ///
    /// Only rate-limit responses are retried at the adapter level; every
    /// other class fails immediately and surfaces as a job failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, UpstreamErrorKind::RateLimited(_))
    }
}

/// Error wrapper with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Upstream Error: {} at line {} in {}", kind, line, file)]
pub struct UpstreamError {
    /// The error kind
    pub kind: UpstreamErrorKind,
    /// Line number where error occurred
    pub line: u32,
    /// File where error occurred
    pub file: &'static str,
}

impl UpstreamError {
    /// Create a new UpstreamError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: UpstreamErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
