//! Detection pipeline: normalize → infer → format, off the async runtime.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use tracing::info;
use yogapose_core::{DetectionResult, PoseError};

use crate::ServerState;

/// Image payload as received from a client.
#[derive(Debug)]
pub enum ImageSource {
    /// Encoded image bytes from a multipart upload.
    Encoded(Bytes),
    /// Base64 text of encoded image bytes.
    Base64(String),
}

impl ImageSource {
    fn len(&self) -> usize {
        match self {
            ImageSource::Encoded(bytes) => bytes.len(),
            ImageSource::Base64(text) => text.len(),
        }
    }
}

/// Runs the whole pipeline on the blocking pool.
///
/// The engine serializes inference internally, so concurrent callers queue
/// on its lock inside their own blocking task.
pub async fn detect(state: &Arc<ServerState>, source: ImageSource) -> Result<DetectionResult, PoseError> {
    let engine = Arc::clone(&state.engine);
    let normalizer = state.normalizer;
    let payload_len = source.len();
    let start = Instant::now();

    let result = tokio::task::spawn_blocking(move || {
        let tensor = match &source {
            ImageSource::Encoded(bytes) => normalizer.normalize(bytes)?,
            ImageSource::Base64(text) => normalizer.normalize_base64(text)?,
        };
        engine.detect(tensor.view())
    })
    .await
    .map_err(|e| PoseError::Internal(format!("detection task failed: {}", e)))??;

    info!(
        payload_bytes = payload_len,
        avg_score = result.avg_score,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Pose detected"
    );
    Ok(result)
}
