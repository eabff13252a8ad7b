//! Byte-level decoding: base64 text and encoded image formats.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::DynamicImage;
use yogapose_core::PoseError;

/// Decodes standard-alphabet base64 text into raw bytes.
///
/// ASCII whitespace anywhere in the text is ignored, so line-wrapped
/// payloads decode as-is. A `data:<mime>;base64,` prefix is stripped.
pub fn decode_base64(text: &str) -> Result<Vec<u8>, PoseError> {
    let payload = strip_data_url(text.trim());
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| PoseError::Base64(e.to_string()))
}

fn strip_data_url(text: &str) -> &str {
    if !text.starts_with("data:") {
        return text;
    }
    text.split_once(',').map_or(text, |(_, rest)| rest)
}

/// Decodes an encoded image, guessing the format from its content.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, PoseError> {
    image::load_from_memory(bytes).map_err(|e| PoseError::Decode(e.to_string()))
}
