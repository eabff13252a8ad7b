//! Standalone connectivity check server.
//!
//! Run this on the laptop and open `http://<laptop-ip>:<port>` from the
//! phone. Binds `YOGAPOSE_HOST`/`YOGAPOSE_PORT` like the main server.

use std::net::SocketAddr;

use anyhow::Result;
use tracing::info;
use yogapose_config::ServerConfig;
use yogapose_server::{connectivity, init_tracing};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env()?;
    let addr = config.bind_addr();

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Test server running on http://{}", listener.local_addr()?);
    info!("Open this address from your phone, using the laptop's LAN IP");

    axum::serve(
        listener,
        connectivity::router().into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
