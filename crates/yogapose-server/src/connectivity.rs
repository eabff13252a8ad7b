//! Bare connectivity check used to verify a phone can reach the host.
//!
//! Answers every `GET`, whatever the path, with a fixed JSON body. It needs
//! no model and is served by the `connection-check` binary.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct ConnectionResponse {
    pub status: &'static str,
    pub message: &'static str,
}

async fn connection_ok(req: Request) -> impl IntoResponse {
    match req.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => info!("Connection from {}", addr.ip()),
        None => info!("Connection from unknown peer"),
    }

    (
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        Json(ConnectionResponse {
            status: "ok",
            message: "Connection successful!",
        }),
    )
}

/// Router answering any `GET` path.
pub fn router() -> Router {
    Router::new()
        .route("/", get(connection_ok))
        .route("/{*path}", get(connection_ok))
}
