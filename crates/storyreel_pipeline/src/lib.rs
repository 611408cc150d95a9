//! Job orchestration.
//!
//! The [`Orchestrator`] drives each job through the fixed stage sequence
//! (spec generation, per-scene assets, video render), recording progress in
//! a [`storyreel_store::JobStore`] so callers can poll. Submission runs the
//! pipeline inline or in a spawned task depending on [`ExecutionMode`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod assembler;
mod config;
mod orchestrator;
mod workdir;

pub use assembler::AssetAssembler;
pub use config::{ExecutionMode, PipelineConfig};
pub use orchestrator::Orchestrator;
