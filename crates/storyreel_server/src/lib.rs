//! HTTP API for the storyreel pipeline.
//!
//! Exposes job submission, status polling, result download and a health
//! probe over axum. The router is built separately from the listener so
//! tests can serve it on an ephemeral port with mock adapters behind the
//! orchestrator.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod routes;
mod state;

pub use routes::{router, JobResponse};
pub use state::AppState;
