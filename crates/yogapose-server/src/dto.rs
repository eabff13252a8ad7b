//! Data transfer objects for HTTP message serialization.

use serde::{Deserialize, Serialize};
use yogapose_engine::TensorSpec;

/// Body of every failed detection: `{"error": "..."}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Response from `GET /`.
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub status: &'static str,
}

/// Response from `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: String,
    pub input: TensorSpec,
    pub output: TensorSpec,
}

/// Form body of `POST /detect_base64`.
#[derive(Debug, Deserialize)]
pub struct Base64Form {
    pub image_data: String,
}
