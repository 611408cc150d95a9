//! Job state store backends.
//!
//! The pipeline records job status, progress counters and artifact locations
//! through the [`JobStore`] trait. Two backends are provided with identical
//! semantics: an in-process [`MemoryJobStore`] and a [`KvJobStore`] backed by
//! a durable REST key-value service for serverless deployments where process
//! memory does not survive between requests. The orchestrator holds an
//! `Arc<dyn JobStore>` and never branches on which backend is active.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod kv;
mod memory;
mod store;

pub use kv::{KvConfig, KvJobStore};
pub use memory::MemoryJobStore;
pub use store::JobStore;

use std::sync::Arc;

/// Select a store backend from the environment.
///
/// Uses the KV backend when `KV_REST_API_URL` and `KV_REST_API_TOKEN` are
/// both set, otherwise falls back to in-process memory.
pub fn store_from_env() -> Arc<dyn JobStore> {
    match KvConfig::from_env() {
        Some(config) => {
            tracing::info!(url = %config.base_url, "Using KV job store");
            Arc::new(KvJobStore::new(config))
        }
        None => {
            tracing::info!("KV store not configured, using in-memory job store");
            Arc::new(MemoryJobStore::new())
        }
    }
}
