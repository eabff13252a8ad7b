//! Channel layout detection and conversion to 8-bit RGB.

use image::{DynamicImage, GrayImage, RgbImage};

/// Source channel arrangement of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    Gray,
    GrayAlpha,
    Rgb,
    Rgba,
}

impl ChannelLayout {
    pub fn of(image: &DynamicImage) -> Self {
        let color = image.color();
        match (color.has_color(), color.has_alpha()) {
            (false, false) => ChannelLayout::Gray,
            (false, true) => ChannelLayout::GrayAlpha,
            (true, false) => ChannelLayout::Rgb,
            (true, true) => ChannelLayout::Rgba,
        }
    }
}

/// Converts any decoded image to 8-bit RGB.
///
/// Grayscale is replicated into all three channels and alpha is dropped
/// without blending. Deeper sample types are scaled down to 8 bits. The
/// decoder already yields RGB order, so three-channel input passes through.
pub fn to_rgb(image: DynamicImage) -> RgbImage {
    match ChannelLayout::of(&image) {
        ChannelLayout::Gray | ChannelLayout::GrayAlpha => expand_gray(&image.into_luma8()),
        ChannelLayout::Rgb | ChannelLayout::Rgba => image.into_rgb8(),
    }
}

fn expand_gray(gray: &GrayImage) -> RgbImage {
    RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
        let [l] = gray.get_pixel(x, y).0;
        image::Rgb([l, l, l])
    })
}
