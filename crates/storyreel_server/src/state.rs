//! Shared server state and wiring from the environment.

use std::sync::Arc;
use std::time::Duration;
use storyreel_adapters::{
    ChatCompletionSpecClient, ImageClientConfig, PredictionImageClient, RenderWorkerClient,
    RenderWorkerConfig, SpecClientConfig, TtsClient, TtsConfig,
};
use storyreel_error::StoryreelResult;
use storyreel_pipeline::{AssetAssembler, Orchestrator, PipelineConfig};
use storyreel_render::{EncoderConfig, FfmpegRenderer, RenderCoordinator};
use storyreel_store::store_from_env;

/// State shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    /// The pipeline driver behind the job endpoints.
    pub orchestrator: Orchestrator,
}

impl AppState {
    /// Wrap an already-wired orchestrator.
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    /// Wire the full production stack from environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the first missing required credential.
    pub fn from_env(config: PipelineConfig) -> StoryreelResult<Self> {
        let store = store_from_env();
        let spec_generator = Arc::new(ChatCompletionSpecClient::new(SpecClientConfig::from_env()?));
        let images = Arc::new(PredictionImageClient::new(ImageClientConfig::from_env()?));
        let speech = Arc::new(TtsClient::new(TtsConfig::from_env()?));

        let assembler = AssetAssembler::new(
            images,
            speech,
            config.scene_concurrency,
            Duration::from_millis(config.scene_delay_ms),
        );
        let worker = RenderWorkerClient::new(RenderWorkerConfig::from_env());
        let local = Arc::new(FfmpegRenderer::new(EncoderConfig::from_env()));
        let renderer = Arc::new(RenderCoordinator::new(worker, local));

        Ok(Self::new(Orchestrator::new(
            store,
            spec_generator,
            assembler,
            renderer,
            config,
        )))
    }
}
