//! The storyreel API server binary.

use clap::Parser;
use std::net::SocketAddr;
use storyreel_pipeline::PipelineConfig;
use storyreel_server::{router, AppState};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "storyreel-server", about = "Social story video generation API")]
struct Cli {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Submission behavior: `sync` holds submissions open until the job
    /// finishes, `async` returns immediately for polling. Overrides
    /// `EXECUTION_MODE`.
    #[arg(long)]
    execution_mode: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = PipelineConfig::from_env();
    if let Some(mode) = &cli.execution_mode {
        config.execution_mode = mode
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid execution mode: {mode}"))?;
    }
    tracing::info!(mode = %config.execution_mode, "Pipeline configured");

    let state = AppState::from_env(config)?;
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "storyreel server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
