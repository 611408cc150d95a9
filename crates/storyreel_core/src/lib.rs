//! Core data types for the storyreel pipeline.
//!
//! This crate defines the shared vocabulary of the workspace: the caller's
//! [`StoryRequest`], the generated [`StorySpec`] with its ordered
//! [`Scene`]s, the [`JobRecord`] tracked by the job state store, and the
//! structured [`SceneManifestEntry`] records sent to the remote render
//! worker.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod job;
mod manifest;
mod request;
mod spec;

pub use job::{JobPatch, JobProgress, JobRecord, JobStatus};
pub use manifest::{AssetRole, SceneManifestEntry};
pub use request::StoryRequest;
pub use spec::{Scene, StorySpec};
