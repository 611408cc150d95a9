//! Video assembly.
//!
//! The [`RenderCoordinator`] turns completed per-scene assets into the final
//! video. It prefers the remote render worker and falls back to local ffmpeg
//! encoding when the worker fails; local encoding failures are fatal.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod coordinator;
mod encoder;
mod srt;

pub use coordinator::{LocalRenderer, RenderCoordinator};
pub use encoder::{EncoderConfig, FfmpegRenderer};
pub use srt::build_srt;
