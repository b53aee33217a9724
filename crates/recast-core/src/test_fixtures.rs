//! In-memory image fixtures shared by the unit tests.
//!
//! Everything is generated on the fly; no test reads from disk.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use crate::decode::Surface;

/// Smooth RGB gradient with full alpha.
pub fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            ((x * 255) / width.max(1)) as u8,
            ((y * 255) / height.max(1)) as u8,
            128,
            255,
        ])
    })
}

/// Deterministic pseudo-random noise. Compresses poorly, so JPEG size
/// responds strongly to quality.
pub fn noise(width: u32, height: u32, seed: u32) -> RgbaImage {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    RgbaImage::from_fn(width, height, |_, _| {
        // xorshift32
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, _] = state.to_le_bytes();
        Rgba([r, g, b, 255])
    })
}

pub fn surface(img: &RgbaImage) -> Surface {
    Surface::from_rgba_image(img.clone())
}

/// Encode a fixture to file bytes in the given container.
pub fn encode_fixture(img: &RgbaImage, format: ImageFormat) -> Vec<u8> {
    let dynamic = if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(img.clone()).into_rgb8())
    } else {
        DynamicImage::ImageRgba8(img.clone())
    };
    let mut buffer = Cursor::new(Vec::new());
    dynamic
        .write_to(&mut buffer, format)
        .unwrap_or_else(|e| panic!("failed to encode {:?} fixture: {}", format, e));
    buffer.into_inner()
}
