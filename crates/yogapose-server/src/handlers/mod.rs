//! HTTP route handlers for the pose server.

pub mod detect;

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::dto::{HealthResponse, RootResponse};
use crate::ServerState;

/// Liveness banner.
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Yoga Pose Detection Server Running",
        status: "ok",
    })
}

/// Health check with the loaded model's tensor descriptors.
pub async fn health(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    let info = state.engine.info();
    Json(HealthResponse {
        status: "ok",
        model: info.model.clone(),
        input: info.input.clone(),
        output: info.output.clone(),
    })
}
