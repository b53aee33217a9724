//! Lossless PNG encoding.
//!
//! Quality has no effect here. Fully opaque surfaces are written without an
//! alpha channel, which keeps PNG output noticeably smaller.

use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};

use super::{validate_surface, EncodeError, EncodeRequest, EncodeResult};
use crate::decode::Surface;
use crate::format::OutputFormat;

pub(crate) fn encode_png(request: &EncodeRequest<'_>) -> Result<EncodeResult, EncodeError> {
    let surface = request.surface;
    validate_surface(surface)?;

    let (pixels, color) = pixel_layout(surface);
    let mut buffer = Vec::new();
    PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, PngFilter::Adaptive)
        .write_image(&pixels, surface.width, surface.height, color)
        .map_err(|e| failed(OutputFormat::Png, e))?;

    Ok(EncodeResult::new(buffer, OutputFormat::Png))
}

/// RGB for opaque surfaces, RGBA otherwise.
pub(super) fn pixel_layout(surface: &Surface) -> (Vec<u8>, ExtendedColorType) {
    if surface.is_opaque() {
        let rgb = surface
            .pixels
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        (rgb, ExtendedColorType::Rgb8)
    } else {
        (surface.pixels.clone(), ExtendedColorType::Rgba8)
    }
}

pub(super) fn failed(format: OutputFormat, err: image::ImageError) -> EncodeError {
    EncodeError::EncodingFailed {
        format,
        message: err.to_string(),
    }
}
