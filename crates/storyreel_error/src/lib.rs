//! Error types for the storyreel pipeline.
//!
//! This crate provides the foundation error types used throughout the
//! storyreel workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use storyreel_error::{StoryreelResult, ValidationError};
//!
//! fn check_request(situation: &str) -> StoryreelResult<()> {
//!     if situation.is_empty() {
//!         Err(ValidationError::new("situation is required"))?
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_request("").is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod pipeline;
mod render;
mod store;
mod upstream;
mod validation;

pub use config::ConfigError;
pub use error::{StoryreelError, StoryreelErrorKind, StoryreelResult};
pub use pipeline::{PipelineError, PipelineErrorKind};
pub use render::{RenderError, RenderErrorKind};
pub use store::{StoreError, StoreErrorKind};
pub use upstream::{UpstreamError, UpstreamErrorKind};
pub use validation::ValidationError;
