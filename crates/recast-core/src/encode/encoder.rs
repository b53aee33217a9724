//! Format dispatch and the encoder seam used by the orchestrator.

use super::jpeg::encode_jpeg;
use super::lossless::encode_png;
use super::webp::encode_webp;
use super::{EncodeError, EncodeRequest, EncodeResult};
use crate::decode::Surface;
use crate::format::OutputFormat;

/// Something that turns a surface into encoded bytes.
///
/// The orchestrator and the quality search are written against this trait,
/// so tests can substitute an encoder whose output size is a known function
/// of quality, or one that counts its calls.
pub trait SurfaceEncoder {
    /// Encode one request. Must not mutate the surface and must allocate a
    /// fresh output buffer per call.
    fn encode(&self, request: &EncodeRequest<'_>) -> Result<EncodeResult, EncodeError>;
}

/// The built-in encoder backed by the `image` crate codecs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterEncoder;

impl SurfaceEncoder for RasterEncoder {
    fn encode(&self, request: &EncodeRequest<'_>) -> Result<EncodeResult, EncodeError> {
        match request.format {
            OutputFormat::Jpeg => encode_jpeg(request),
            OutputFormat::Png => encode_png(request),
            OutputFormat::WebP => encode_webp(request),
        }
    }
}

impl<E: SurfaceEncoder + ?Sized> SurfaceEncoder for &E {
    fn encode(&self, request: &EncodeRequest<'_>) -> Result<EncodeResult, EncodeError> {
        (**self).encode(request)
    }
}

/// Encode a surface with the built-in codecs.
///
/// # Arguments
///
/// * `surface` - Pixels to encode
/// * `format` - Target container
/// * `quality` - Normalized quality in [0, 1]; ignored for PNG
///
/// # Errors
///
/// Returns an `EncodeError` for zero-area or malformed surfaces, an
/// out-of-range quality on a lossy format, or a codec failure.
pub fn encode(
    surface: &Surface,
    format: OutputFormat,
    quality: f64,
) -> Result<EncodeResult, EncodeError> {
    RasterEncoder.encode(&EncodeRequest::new(surface, format, quality))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{gradient, surface};

    #[test]
    fn test_dispatch_by_format() {
        let src = surface(&gradient(12, 12));
        for format in OutputFormat::ALL {
            let result = encode(&src, format, 0.8).unwrap();
            assert_eq!(result.format(), format);
            assert!(result.byte_len() > 0);
        }
    }

    #[test]
    fn test_encode_does_not_mutate_surface() {
        let src = surface(&gradient(12, 12));
        let before = src.pixels.clone();
        encode(&src, OutputFormat::Jpeg, 0.3).unwrap();
        assert_eq!(src.pixels, before);
    }

    #[test]
    fn test_lossless_ignores_invalid_quality() {
        let src = surface(&gradient(4, 4));
        assert!(encode(&src, OutputFormat::Png, 7.0).is_ok());
        assert!(encode(&src, OutputFormat::Jpeg, 7.0).is_err());
    }

    #[test]
    fn test_reference_encoder() {
        fn encoded_len<E: SurfaceEncoder>(encoder: E, request: &EncodeRequest<'_>) -> usize {
            encoder.encode(request).unwrap().byte_len()
        }

        let src = surface(&gradient(4, 4));
        let request = EncodeRequest::new(&src, OutputFormat::Png, 1.0);
        assert_eq!(
            encoded_len(&RasterEncoder, &request),
            encoded_len(RasterEncoder, &request)
        );
    }
}
