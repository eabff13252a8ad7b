//! Bilinear resize reproducing OpenCV's 8-bit `INTER_LINEAR`.
//!
//! Destination pixel centers are mapped back into the source, the two
//! nearest source columns/rows are blended, and coordinates past the edge
//! are clamped. No antialiasing is applied when shrinking.
//!
//! Blending uses 11-bit fixed-point weights. The horizontal pass keeps full
//! precision; the vertical pass drops 4 bits, takes the high half of each
//! 16×16 product and rounds the sum, as OpenCV's vectorized row kernel does.
//! An exact 2× reduction on both axes averages 2×2 blocks instead.

use image::{Rgb, RgbImage};

const COEF_BITS: u32 = 11;
const COEF_SCALE: i32 = 1 << COEF_BITS;

/// One destination coordinate's source taps and their fixed-point weights.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Tap {
    near: u32,
    far: u32,
    near_weight: i32,
    far_weight: i32,
}

fn taps(src_len: u32, dst_len: u32) -> Vec<Tap> {
    let scale = src_len as f64 / dst_len as f64;
    let last = src_len.saturating_sub(1);

    (0..dst_len)
        .map(|d| {
            let pos = ((d as f64 + 0.5) * scale - 0.5) as f32;
            let floor = pos.floor();
            let (near, frac) = if floor < 0.0 {
                (0, 0.0)
            } else if floor as u32 >= last {
                (last, 0.0)
            } else {
                (floor as u32, pos - floor)
            };
            let near_weight = ((1.0 - frac) * COEF_SCALE as f32).round() as i32;
            Tap {
                near,
                far: (near + 1).min(last),
                near_weight,
                far_weight: COEF_SCALE - near_weight,
            }
        })
        .collect()
}

fn horizontal(src: &RgbImage, row: u32, cols: &[Tap]) -> Vec<i32> {
    let mut out = Vec::with_capacity(cols.len() * 3);
    for tap in cols {
        let near = src.get_pixel(tap.near, row).0;
        let far = src.get_pixel(tap.far, row).0;
        for c in 0..3 {
            out.push(i32::from(near[c]) * tap.near_weight + i32::from(far[c]) * tap.far_weight);
        }
    }
    out
}

fn mul_hi(a: i32, b: i32) -> i32 {
    (a * b) >> 16
}

fn vertical(top: i32, bottom: i32, tap: &Tap) -> u8 {
    let sum = mul_hi(top >> 4, tap.near_weight) + mul_hi(bottom >> 4, tap.far_weight);
    ((sum + 2) >> 2).clamp(0, 255) as u8
}

fn halve(src: &RgbImage, width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let (sx, sy) = (x * 2, y * 2);
        let block = [
            src.get_pixel(sx, sy).0,
            src.get_pixel(sx + 1, sy).0,
            src.get_pixel(sx, sy + 1).0,
            src.get_pixel(sx + 1, sy + 1).0,
        ];
        let mut out = [0u8; 3];
        for c in 0..3 {
            let sum: u32 = block.iter().map(|p| u32::from(p[c])).sum();
            out[c] = ((sum + 2) >> 2) as u8;
        }
        Rgb(out)
    })
}

/// Resizes `src` to exactly `width`×`height`; aspect ratio is not kept.
pub fn resize_linear(src: &RgbImage, width: u32, height: u32) -> RgbImage {
    if src.dimensions() == (width, height) {
        return src.clone();
    }
    if width > 0 && height > 0 && src.width() == width * 2 && src.height() == height * 2 {
        return halve(src, width, height);
    }

    let cols = taps(src.width(), width);
    let rows = taps(src.height(), height);
    let mut out = RgbImage::new(width, height);

    for (y, tap) in rows.iter().enumerate() {
        let top = horizontal(src, tap.near, &cols);
        let bottom = horizontal(src, tap.far, &cols);
        for x in 0..width as usize {
            let mut px = [0u8; 3];
            for c in 0..3 {
                px[c] = vertical(top[x * 3 + c], bottom[x * 3 + c], tap);
            }
            out.put_pixel(x as u32, y as u32, Rgb(px));
        }
    }
    out
}
