//! Image normalization for the pose model.
//!
//! Turns uploaded bytes into the `[1, 256, 256, 3]` RGB `u8` tensor the
//! engine consumes:
//!
//! 1. [`decode_base64`] (base64 endpoint only)
//! 2. [`decode_image`] — any format the `image` crate can guess
//! 3. [`to_rgb`] — gray expanded, alpha dropped
//! 4. [`resize_linear`] — stretched to 256×256, aspect ratio not kept
//! 5. [`to_input_tensor`] — leading batch dimension added
//!
//! ```rust
//! use yogapose_vision::Normalizer;
//!
//! let normalizer = Normalizer::default();
//! assert!(normalizer.normalize(b"definitely not an image").is_err());
//! ```

mod decode;
mod layout;
mod resize;

use image::RgbImage;
use ndarray::Array4;
use tracing::debug;
use yogapose_core::{PoseError, MODEL_INPUT_SIZE};

pub use decode::{decode_base64, decode_image};
pub use layout::{to_rgb, ChannelLayout};
pub use resize::resize_linear;

/// Adds the batch dimension to an RGB frame: `[1, height, width, 3]`.
pub fn to_input_tensor(rgb: RgbImage) -> Result<Array4<u8>, PoseError> {
    let (width, height) = rgb.dimensions();
    let shape = (1, height as usize, width as usize, 3);
    Array4::from_shape_vec(shape, rgb.into_raw()).map_err(|e| PoseError::Internal(e.to_string()))
}

/// Converts encoded images into model input tensors.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    width: u32,
    height: u32,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            width: MODEL_INPUT_SIZE as u32,
            height: MODEL_INPUT_SIZE as u32,
        }
    }
}

impl Normalizer {
    /// Encoded image bytes to tensor.
    pub fn normalize(&self, bytes: &[u8]) -> Result<Array4<u8>, PoseError> {
        let image = decode_image(bytes)?;
        let layout = ChannelLayout::of(&image);
        debug!(
            width = image.width(),
            height = image.height(),
            layout = ?layout,
            "Decoded image"
        );

        let rgb = to_rgb(image);
        let resized = resize_linear(&rgb, self.width, self.height);
        to_input_tensor(resized)
    }

    /// Base64 text of encoded image bytes to tensor.
    pub fn normalize_base64(&self, text: &str) -> Result<Array4<u8>, PoseError> {
        let bytes = decode_base64(text)?;
        self.normalize(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use image::{DynamicImage, GrayImage, ImageFormat, Rgb, Rgba, RgbaImage};

    use super::*;

    fn png(image: DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    #[test]
    fn any_shape_becomes_model_input() {
        let normalizer = Normalizer::default();
        for (w, h) in [(10, 10), (640, 480), (37, 901)] {
            let bytes = png(DynamicImage::ImageRgb8(RgbImage::new(w, h)));
            let tensor = normalizer.normalize(&bytes).unwrap();
            assert_eq!(tensor.shape(), &[1, 256, 256, 3]);
        }
    }

    #[test]
    fn pixel_values_land_in_hwc_order() {
        let bytes = png(DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]))));
        let tensor = Normalizer::default().normalize(&bytes).unwrap();
        assert_eq!(tensor[[0, 100, 200, 0]], 10);
        assert_eq!(tensor[[0, 100, 200, 1]], 20);
        assert_eq!(tensor[[0, 100, 200, 2]], 30);
    }

    #[test]
    fn gray_and_rgba_sources_are_accepted() {
        let normalizer = Normalizer::default();

        let gray = png(DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, image::Luma([50]))));
        let tensor = normalizer.normalize(&gray).unwrap();
        assert!(tensor.iter().all(|&v| v == 50));

        let rgba = png(DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 128]))));
        let tensor = normalizer.normalize(&rgba).unwrap();
        assert_eq!(tensor[[0, 0, 0, 0]], 1);
        assert_eq!(tensor[[0, 255, 255, 2]], 3);
    }

    #[test]
    fn base64_path_matches_raw_path() {
        let bytes = png(DynamicImage::ImageRgb8(RgbImage::from_fn(30, 20, |x, y| {
            Rgb([x as u8 * 8, y as u8 * 12, 7])
        })));
        let normalizer = Normalizer::default();

        let raw = normalizer.normalize(&bytes).unwrap();
        let via_b64 = normalizer.normalize_base64(&STANDARD.encode(&bytes)).unwrap();
        assert_eq!(raw, via_b64);
    }

    #[test]
    fn base64_errors_are_distinguished_from_decode_errors() {
        let normalizer = Normalizer::default();
        assert_eq!(normalizer.normalize_base64("%%%").unwrap_err().kind(), "base64");
        let text = STANDARD.encode(b"plain text file");
        assert_eq!(normalizer.normalize_base64(&text).unwrap_err().kind(), "decode");
    }
}
