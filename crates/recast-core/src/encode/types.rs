//! Core types for image encoding.

use thiserror::Error;

use crate::decode::Surface;
use crate::format::OutputFormat;

/// Background used when flattening alpha for formats without it.
pub const DEFAULT_BACKGROUND: [u8; 3] = [255, 255, 255];

/// Errors that can occur during encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes (width * height * 4), got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// Quality outside [0, 1] for a lossy format
    #[error("Invalid quality {quality} for {format}: expected a value in [0, 1]")]
    InvalidQuality { quality: f64, format: OutputFormat },

    /// The underlying codec failed
    #[error("{format} encoding failed: {message}")]
    EncodingFailed {
        format: OutputFormat,
        message: String,
    },
}

/// One encode call: which surface, into which format, at which quality.
#[derive(Debug, Clone, Copy)]
pub struct EncodeRequest<'a> {
    pub surface: &'a Surface,
    pub format: OutputFormat,
    /// Normalized quality in [0, 1]. Ignored by lossless formats.
    pub quality: f64,
    /// Color composited under transparent pixels when the format has no alpha.
    pub background: [u8; 3],
}

impl<'a> EncodeRequest<'a> {
    pub fn new(surface: &'a Surface, format: OutputFormat, quality: f64) -> Self {
        Self {
            surface,
            format,
            quality,
            background: DEFAULT_BACKGROUND,
        }
    }

    pub fn with_background(mut self, background: [u8; 3]) -> Self {
        self.background = background;
        self
    }

    /// Quality the codec actually uses: lossless formats always get 1.0.
    pub fn effective_quality(&self) -> f64 {
        if self.format.is_lossy() {
            self.quality
        } else {
            1.0
        }
    }
}

/// Encoded output bytes. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeResult {
    bytes: Vec<u8>,
    format: OutputFormat,
}

impl EncodeResult {
    pub fn new(bytes: Vec<u8>, format: OutputFormat) -> Self {
        Self { bytes, format }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }
}

/// Map a normalized quality in [0, 1] to a codec's 1-100 scale.
pub(crate) fn quality_percent(quality: f64, format: OutputFormat) -> Result<u8, EncodeError> {
    if !(0.0..=1.0).contains(&quality) {
        return Err(EncodeError::InvalidQuality { quality, format });
    }
    Ok(((quality * 100.0).round() as u8).clamp(1, 100))
}

/// Check that a surface can be handed to a codec.
pub(crate) fn validate_surface(surface: &Surface) -> Result<(), EncodeError> {
    let (width, height) = surface.dimensions();
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }

    let expected = (width as usize) * (height as usize) * 4;
    if surface.pixels.len() != expected {
        return Err(EncodeError::InvalidPixelData {
            expected,
            actual: surface.pixels.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_quality() {
        let surface = Surface::new(1, 1, vec![0, 0, 0, 255]);
        assert_eq!(
            EncodeRequest::new(&surface, OutputFormat::Jpeg, 0.4).effective_quality(),
            0.4
        );
        assert_eq!(
            EncodeRequest::new(&surface, OutputFormat::Png, 0.4).effective_quality(),
            1.0
        );
        assert_eq!(
            EncodeRequest::new(&surface, OutputFormat::WebP, 0.4).effective_quality(),
            0.4
        );
    }

    #[test]
    fn test_validate_surface() {
        assert!(validate_surface(&Surface::new(2, 2, vec![0; 16])).is_ok());

        let zero = Surface {
            width: 0,
            height: 4,
            pixels: vec![],
        };
        assert!(matches!(
            validate_surface(&zero),
            Err(EncodeError::InvalidDimensions { .. })
        ));

        let short = Surface {
            width: 2,
            height: 2,
            pixels: vec![0; 15],
        };
        assert!(matches!(
            validate_surface(&short),
            Err(EncodeError::InvalidPixelData {
                expected: 16,
                actual: 15
            })
        ));
    }

    #[test]
    fn test_encode_error_display() {
        let err = EncodeError::InvalidQuality {
            quality: 1.5,
            format: OutputFormat::Jpeg,
        };
        assert_eq!(
            err.to_string(),
            "Invalid quality 1.5 for jpeg: expected a value in [0, 1]"
        );
    }
}
