//! Pipeline execution settings.

use std::path::PathBuf;
use std::str::FromStr;

/// How `submit` drives the pipeline.
///
/// `Async` spawns the job and returns immediately; the caller polls for
/// status. `Sync` holds the submission open until the job reaches a terminal
/// state, for deployments without a background task runtime.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum ExecutionMode {
    /// Await the full pipeline inside the submission call.
    Sync,
    /// Spawn the pipeline and return the queued record immediately.
    Async,
}

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Submission behavior; defaults to async.
    pub execution_mode: ExecutionMode,

    /// Upper bound on scenes generating assets concurrently.
    pub scene_concurrency: usize,

    /// Pause between scene launches, to pace upstream quota consumption.
    pub scene_delay_ms: u64,

    /// Directory under which job-scoped working directories are created.
    pub workdir_root: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            execution_mode: ExecutionMode::Async,
            scene_concurrency: 1,
            scene_delay_ms: 1000,
            workdir_root: std::env::temp_dir().join("storyreel"),
        }
    }
}

impl PipelineConfig {
    /// Read pipeline settings from the environment.
    ///
    /// Reads `EXECUTION_MODE` (`sync` or `async`, default `async`),
    /// `SCENE_CONCURRENCY` (default 1), `SCENE_DELAY_MS` (default 1000) and
    /// `WORKDIR_ROOT` (default a `storyreel` directory under the system
    /// temp dir). Unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            execution_mode: std::env::var("EXECUTION_MODE")
                .ok()
                .and_then(|v| ExecutionMode::from_str(&v).ok())
                .unwrap_or(defaults.execution_mode),
            scene_concurrency: env_parse("SCENE_CONCURRENCY", defaults.scene_concurrency),
            scene_delay_ms: env_parse("SCENE_DELAY_MS", defaults.scene_delay_ms),
            workdir_root: std::env::var("WORKDIR_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.workdir_root),
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
