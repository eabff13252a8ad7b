//! HTTP server entry point.
//!
//! Loads configuration, loads the pose model (startup aborts if it cannot be
//! loaded), and serves the Axum router.

use anyhow::{Context, Result};
use tracing::info;
use yogapose_config::ServerConfig;
use yogapose_server::{build_app, init_tracing};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env().context("invalid configuration")?;

    info!("Loading MoveNet Thunder model...");
    let app = build_app(&config)
        .with_context(|| format!("failed to load model '{}'", config.model_path.display()))?;
    info!("Model loaded successfully!");

    let addr = config.bind_addr();
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
