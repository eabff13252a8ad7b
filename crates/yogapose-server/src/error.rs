//! Application error types and Axum response conversion.
//!
//! Pipeline failures are reported in the body with HTTP 200; only malformed
//! requests get a non-200 status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;
use yogapose_core::PoseError;

use crate::dto::ErrorResponse;

/// Fixed message for undecodable uploads on `/detect`.
pub const DECODE_FAILURE: &str = "Failed to decode image";

/// Application-level errors.
#[derive(Debug)]
pub enum AppError {
    /// A required form field was absent.
    MissingField(&'static str),
    /// An extractor rejected the body, e.g. over the upload limit.
    Rejected { status: StatusCode, message: String },
    /// Normalization, inference or formatting failed.
    Pipeline { kind: &'static str, message: String },
}

impl AppError {
    /// Keeps the status and text axum chose for an extractor rejection.
    pub fn rejected(status: StatusCode, message: String) -> Self {
        Self::Rejected { status, message }
    }

    /// Pipeline error raised by the multipart upload endpoint.
    pub fn upload(err: PoseError) -> Self {
        let message = match &err {
            PoseError::Decode(_) => DECODE_FAILURE.to_string(),
            other => other.to_string(),
        };
        Self::Pipeline { kind: err.kind(), message }
    }

    /// Pipeline error raised by the base64 endpoint.
    pub fn base64(err: PoseError) -> Self {
        Self::Pipeline {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::MissingField(field) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Missing form field '{}'", field),
            ),
            AppError::Rejected { status, message } => (status, message),
            AppError::Pipeline { kind, message } => {
                warn!(kind, "Detection failed: {}", message);
                (StatusCode::OK, message)
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_decode_failures_use_fixed_text() {
        let err = AppError::upload(PoseError::Decode("The image format could not be determined".into()));
        assert!(matches!(err, AppError::Pipeline { ref message, .. } if message == DECODE_FAILURE));
    }

    #[test]
    fn base64_decode_failures_keep_decoder_text() {
        let err = AppError::base64(PoseError::Decode("The image format could not be determined".into()));
        assert!(matches!(
            err,
            AppError::Pipeline { ref message, kind: "decode" } if message == "The image format could not be determined"
        ));
    }

    #[test]
    fn pipeline_errors_are_http_200() {
        let response = AppError::upload(PoseError::Engine("boom".into())).into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let response = AppError::MissingField("file").into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = AppError::rejected(StatusCode::PAYLOAD_TOO_LARGE, "too big".into()).into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
