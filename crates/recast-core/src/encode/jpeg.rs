//! JPEG encoding.
//!
//! Uses the `image` crate's baseline JPEG encoder. JPEG has no alpha, so
//! the surface is composited over the request's background first.

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};

use super::types::quality_percent;
use super::{validate_surface, EncodeError, EncodeRequest, EncodeResult};
use crate::format::OutputFormat;

/// Map a normalized quality in [0, 1] to the encoder's 1-100 scale.
///
/// # Errors
///
/// Returns `EncodeError::InvalidQuality` for NaN or values outside [0, 1].
pub fn quality_to_jpeg(quality: f64) -> Result<u8, EncodeError> {
    quality_percent(quality, OutputFormat::Jpeg)
}

pub(crate) fn encode_jpeg(request: &EncodeRequest<'_>) -> Result<EncodeResult, EncodeError> {
    let surface = request.surface;
    validate_surface(surface)?;
    let quality = quality_to_jpeg(request.quality)?;

    let rgb = surface.flatten_rgb(request.background);
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .write_image(&rgb, surface.width, surface.height, ExtendedColorType::Rgb8)
        .map_err(|e| EncodeError::EncodingFailed {
            format: OutputFormat::Jpeg,
            message: e.to_string(),
        })?;

    Ok(EncodeResult::new(buffer, OutputFormat::Jpeg))
}
