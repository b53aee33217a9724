//! WebP encoding.
//!
//! The pure-Rust encoder only writes VP8L, which also keeps the crate
//! building for `wasm32-unknown-unknown`. Quality below 1.0 is emulated by
//! quantizing the color channels before the lossless pass: fewer distinct
//! values compress to fewer bytes, and the level count grows with quality,
//! so size stays monotonic in quality the way the search expects.
//! Alpha is never quantized.

use image::codecs::webp::WebPEncoder;
use image::ImageEncoder;

use super::lossless::{failed, pixel_layout};
use super::types::quality_percent;
use super::{validate_surface, EncodeError, EncodeRequest, EncodeResult};
use crate::format::OutputFormat;

pub(crate) fn encode_webp(request: &EncodeRequest<'_>) -> Result<EncodeResult, EncodeError> {
    let surface = request.surface;
    validate_surface(surface)?;
    let percent = quality_percent(request.quality, OutputFormat::WebP)?;

    let (mut pixels, color) = pixel_layout(surface);
    quantize_color(&mut pixels, usize::from(color.channel_count()), percent);

    let mut buffer = Vec::new();
    WebPEncoder::new_lossless(&mut buffer)
        .write_image(&pixels, surface.width, surface.height, color)
        .map_err(|e| failed(OutputFormat::WebP, e))?;

    Ok(EncodeResult::new(buffer, OutputFormat::WebP))
}

/// Snap the first three channels of every pixel onto `levels(percent)`
/// evenly spaced values.
fn quantize_color(pixels: &mut [u8], channels: usize, percent: u8) {
    let levels = levels(percent);
    if levels >= 256 {
        return;
    }
    let step = 255.0 / f32::from(levels - 1);
    for pixel in pixels.chunks_exact_mut(channels) {
        for channel in pixel.iter_mut().take(3) {
            let bucket = (f32::from(*channel) / step).round();
            *channel = (bucket * step).round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Distinct values per channel. Quadratic, so high qualities stay close to
/// the source while low ones shrink hard.
fn levels(percent: u8) -> u16 {
    if percent >= 100 {
        return 256;
    }
    let q = f32::from(percent.max(1)) / 100.0;
    (2.0 + q * q * 254.0).round().clamp(2.0, 256.0) as u16
}
