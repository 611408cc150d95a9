//! Top-level error wrapper types.

use crate::{
    ConfigError, PipelineError, RenderError, StoreError, UpstreamError, ValidationError,
};

/// This is the foundation error enum. Each workspace crate contributes a
/// variant for its error domain.
///
/// # Examples
///
/// ```
/// use storyreel_error::{StoryreelError, ValidationError};
///
/// let val_err = ValidationError::new("situation is required");
/// let err: StoryreelError = val_err.into();
/// assert!(format!("{}", err).contains("Validation Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum StoryreelErrorKind {
    /// Bad caller input or non-conforming generated spec
    #[from(ValidationError)]
    Validation(ValidationError),
    /// Missing credential or setting
    #[from(ConfigError)]
    Config(ConfigError),
    /// External service adapter failure
    #[from(UpstreamError)]
    Upstream(UpstreamError),
    /// Video rendering failure
    #[from(RenderError)]
    Render(RenderError),
    /// Job state store failure
    #[from(StoreError)]
    Store(StoreError),
    /// Job lifecycle failure
    #[from(PipelineError)]
    Pipeline(PipelineError),
}

/// Storyreel error with kind discrimination.
///
/// # Examples
///
/// ```
/// use storyreel_error::{StoryreelResult, ConfigError};
///
/// fn might_fail() -> StoryreelResult<()> {
///     Err(ConfigError::new("OPENAI_API_KEY not set"))?
/// }
///
/// assert!(might_fail().is_err());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Storyreel Error: {}", _0)]
pub struct StoryreelError(Box<StoryreelErrorKind>);

impl StoryreelError {
    /// Create a new error from a kind.
    pub fn new(kind: StoryreelErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &StoryreelErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to StoryreelErrorKind
impl<T> From<T> for StoryreelError
where
    T: Into<StoryreelErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for storyreel operations.
pub type StoryreelResult<T> = std::result::Result<T, StoryreelError>;
