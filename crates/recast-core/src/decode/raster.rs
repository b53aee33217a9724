//! Raster decoding with EXIF orientation handling.

use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::{DynamicImage, ImageFormat, ImageReader};

use super::{DecodeError, Orientation, SourceAsset, Surface};
use crate::format::SourceFormat;

/// Decode a source asset into a surface at its natural size.
///
/// The decoder is selected from the asset's leading bytes, falling back to
/// the declared MIME type and file extension. For JPEG the EXIF orientation
/// is applied, so the surface has the dimensions the image is displayed at.
/// Animated GIFs decode to their first frame.
///
/// # Errors
///
/// * `DecodeError::InvalidFormat` - the bytes match no known format
/// * `DecodeError::UnsupportedFormat` - HEIC/HEIF without the `heic` feature
/// * `DecodeError::CorruptedFile` - the decoder rejected the data
/// * `DecodeError::EmptyImage` - the image has zero area
pub fn decode(asset: &SourceAsset<'_>) -> Result<Surface, DecodeError> {
    let format = asset.format().ok_or(DecodeError::InvalidFormat)?;
    let image_format = match format {
        SourceFormat::Png => ImageFormat::Png,
        SourceFormat::Jpeg => ImageFormat::Jpeg,
        SourceFormat::WebP => ImageFormat::WebP,
        SourceFormat::Gif => ImageFormat::Gif,
        #[cfg(feature = "heic")]
        SourceFormat::Heic => return super::heic::decode_heic(asset.bytes),
        #[cfg(not(feature = "heic"))]
        SourceFormat::Heic => return Err(DecodeError::UnsupportedFormat("HEIC")),
    };

    let img = ImageReader::with_format(Cursor::new(asset.bytes), image_format)
        .decode()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    let img = if format == SourceFormat::Jpeg {
        apply_orientation(img, extract_orientation(asset.bytes))
    } else {
        img
    };

    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 {
        return Err(DecodeError::EmptyImage { width, height });
    }

    Ok(Surface::from_rgba_image(img.into_rgba8()))
}

/// Extract EXIF orientation from container bytes.
///
/// Returns `Orientation::Normal` if no EXIF data is found or orientation
/// cannot be determined.
pub fn extract_orientation(bytes: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(bytes);
    Reader::new()
        .read_from_container(&mut cursor)
        .ok()
        .and_then(|exif| {
            exif.get_field(Tag::Orientation, In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
        })
        .map(Orientation::from)
        .unwrap_or_default()
}

fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => img,
        Orientation::FlipHorizontal => img.fliph(),
        Orientation::Rotate180 => img.rotate180(),
        Orientation::FlipVertical => img.flipv(),
        Orientation::Transpose => img.rotate90().fliph(),
        Orientation::Rotate90CW => img.rotate90(),
        Orientation::Transverse => img.rotate270().fliph(),
        Orientation::Rotate270CW => img.rotate270(),
    }
}
