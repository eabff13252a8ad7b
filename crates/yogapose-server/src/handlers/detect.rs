//! Pose detection endpoints (multipart upload and base64 form).

use std::sync::Arc;

use axum::{
    extract::{
        multipart::MultipartRejection, rejection::FormRejection, FromRequest, Multipart, Request,
        State,
    },
    http::header::CONTENT_TYPE,
    Form, Json,
};
use tracing::info;
use yogapose_core::DetectionResult;

use crate::dto::Base64Form;
use crate::error::AppError;
use crate::services::detect::{detect, ImageSource};
use crate::ServerState;

const FILE_FIELD: &str = "file";
const BASE64_FIELD: &str = "image_data";

/// `POST /detect` with a multipart `file` field.
pub async fn detect_upload(
    State(state): State<Arc<ServerState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectionResult>, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::rejected(e.status(), e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::rejected(e.status(), e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::rejected(e.status(), e.body_text()))?;
        info!("Upload received: '{}' ({} bytes)", filename, data.len());

        let result = detect(&state, ImageSource::Encoded(data))
            .await
            .map_err(AppError::upload)?;
        return Ok(Json(result));
    }

    Err(AppError::MissingField(FILE_FIELD))
}

/// `POST /detect_base64` with an `image_data` form field.
///
/// Accepts both `application/x-www-form-urlencoded` and `multipart/form-data`.
pub async fn detect_base64(
    State(state): State<Arc<ServerState>>,
    req: Request,
) -> Result<Json<DetectionResult>, AppError> {
    let text = read_base64_field(&state, req).await?;
    info!("Base64 payload received ({} chars)", text.len());

    let result = detect(&state, ImageSource::Base64(text))
        .await
        .map_err(AppError::base64)?;
    Ok(Json(result))
}

async fn read_base64_field(state: &Arc<ServerState>, req: Request) -> Result<String, AppError> {
    let is_multipart = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    if !is_multipart {
        let Form(form) = Form::<Base64Form>::from_request(req, state)
            .await
            .map_err(|e| match e {
                FormRejection::FailedToDeserializeForm(_)
                | FormRejection::FailedToDeserializeFormBody(_) => AppError::MissingField(BASE64_FIELD),
                other => AppError::rejected(other.status(), other.body_text()),
            })?;
        return Ok(form.image_data);
    }

    let mut multipart = Multipart::from_request(req, state)
        .await
        .map_err(|e| AppError::rejected(e.status(), e.body_text()))?;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::rejected(e.status(), e.body_text()))?
    {
        if field.name() == Some(BASE64_FIELD) {
            return field
                .text()
                .await
                .map_err(|e| AppError::rejected(e.status(), e.body_text()));
        }
    }
    Err(AppError::MissingField(BASE64_FIELD))
}
