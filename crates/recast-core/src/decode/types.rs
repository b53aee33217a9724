//! Core types for image decoding.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::format::SourceFormat;

/// Error types for image decoding operations.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The bytes match no format the pipeline knows.
    #[error("Invalid or unsupported image format")]
    InvalidFormat,

    /// The format was recognised but cannot be decoded by this build.
    #[error("Unsupported source format: {0}")]
    UnsupportedFormat(&'static str),

    /// The image file is corrupted or incomplete.
    #[error("Corrupted or incomplete image file: {0}")]
    CorruptedFile(String),

    /// The image decoded to a zero-area bitmap.
    #[error("Image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}

/// Filter type for image resizing operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// Nearest neighbor interpolation (fastest, lowest quality).
    Nearest,
    /// Bilinear interpolation (fast, acceptable quality).
    Bilinear,
    /// Lanczos3 interpolation (slower, highest quality).
    #[default]
    Lanczos3,
}

impl FilterType {
    /// Convert to the image crate's FilterType.
    pub fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            FilterType::Nearest => image::imageops::FilterType::Nearest,
            FilterType::Bilinear => image::imageops::FilterType::Triangle,
            FilterType::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// EXIF orientation values (1-8).
/// See: https://exiftool.org/TagNames/EXIF.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Orientation {
    #[default]
    Normal = 1,
    FlipHorizontal = 2,
    Rotate180 = 3,
    FlipVertical = 4,
    /// Flip horizontal + rotate 270 CW.
    Transpose = 5,
    Rotate90CW = 6,
    /// Flip horizontal + rotate 90 CW.
    Transverse = 7,
    Rotate270CW = 8,
}

impl From<u32> for Orientation {
    fn from(value: u32) -> Self {
        match value {
            2 => Orientation::FlipHorizontal,
            3 => Orientation::Rotate180,
            4 => Orientation::FlipVertical,
            5 => Orientation::Transpose,
            6 => Orientation::Rotate90CW,
            7 => Orientation::Transverse,
            8 => Orientation::Rotate270CW,
            _ => Orientation::Normal,
        }
    }
}

/// Caller-supplied input: the raw file bytes and what the upload surface
/// declared about them.
///
/// Immutable once constructed. The bytes are borrowed; the pipeline never
/// copies or mutates them.
#[derive(Debug, Clone, Copy)]
pub struct SourceAsset<'a> {
    /// Raw file contents.
    pub bytes: &'a [u8],
    /// File name as uploaded, used for the output name and as a format hint.
    pub file_name: &'a str,
    /// Declared MIME type, if the upload surface provided one.
    pub mime_type: Option<&'a str>,
}

impl<'a> SourceAsset<'a> {
    pub fn new(bytes: &'a [u8], file_name: &'a str) -> Self {
        Self {
            bytes,
            file_name,
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: &'a str) -> Self {
        self.mime_type = Some(mime_type);
        self
    }

    /// Size of the original file in bytes.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Format the decoder should use.
    ///
    /// The leading bytes win over the declared MIME type, which wins over
    /// the file extension.
    pub fn format(&self) -> Option<SourceFormat> {
        SourceFormat::sniff(self.bytes)
            .or_else(|| self.mime_type.and_then(SourceFormat::from_mime))
            .or_else(|| SourceFormat::from_file_name(self.file_name))
    }
}

/// An in-memory RGBA bitmap that the encoder reads from.
///
/// A surface is exclusively owned by the call that created it and is
/// released when dropped, on success and error paths alike.
#[derive(Debug, Clone)]
pub struct Surface {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA pixel data in row-major order (4 bytes per pixel).
    pub pixels: Vec<u8>,
}

impl Surface {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(
            pixels.len(),
            (width as usize) * (height as usize) * 4,
            "Pixel buffer size mismatch"
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn from_rgba_image(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            pixels: img.into_raw(),
        }
    }

    /// Borrow the pixels as an image buffer without copying.
    pub fn as_rgba_image(&self) -> Option<image::ImageBuffer<image::Rgba<u8>, &[u8]>> {
        image::ImageBuffer::from_raw(self.width, self.height, self.pixels.as_slice())
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }

    /// True when every pixel has full alpha.
    pub fn is_opaque(&self) -> bool {
        self.pixels.chunks_exact(4).all(|px| px[3] == u8::MAX)
    }

    /// Composite over a solid background, dropping the alpha channel.
    pub fn flatten_rgb(&self, background: [u8; 3]) -> Vec<u8> {
        let mut out = Vec::with_capacity((self.width as usize) * (self.height as usize) * 3);
        for px in self.pixels.chunks_exact(4) {
            let alpha = px[3] as u32;
            for c in 0..3 {
                let fg = px[c] as u32;
                let bg = background[c] as u32;
                // Rounded integer blend: (fg * a + bg * (255 - a)) / 255
                out.push(((fg * alpha + bg * (255 - alpha) + 127) / 255) as u8);
            }
        }
        out
    }
}
