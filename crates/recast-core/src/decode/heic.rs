//! HEIC/HEIF decoding through libheif.
//!
//! Only compiled with the `heic` feature. libheif applies the container's
//! rotation and mirror transforms while decoding, so no EXIF pass is needed.

use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

use super::{DecodeError, Surface};

pub(crate) fn decode_heic(bytes: &[u8]) -> Result<Surface, DecodeError> {
    let lib_heif = LibHeif::new();
    let ctx = HeifContext::read_from_bytes(bytes).map_err(corrupted)?;
    let handle = ctx.primary_image_handle().map_err(corrupted)?;

    let image = lib_heif
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgba), None)
        .map_err(corrupted)?;
    let planes = image.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| DecodeError::CorruptedFile("no interleaved RGBA plane".to_string()))?;

    let (width, height) = (plane.width, plane.height);
    if width == 0 || height == 0 {
        return Err(DecodeError::EmptyImage { width, height });
    }

    // Rows may be padded past width * 4.
    let row_len = width as usize * 4;
    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in plane.data.chunks(plane.stride).take(height as usize) {
        let row = row
            .get(..row_len)
            .ok_or_else(|| DecodeError::CorruptedFile("short RGBA row".to_string()))?;
        pixels.extend_from_slice(row);
    }

    Ok(Surface::new(width, height, pixels))
}

fn corrupted(err: libheif_rs::HeifError) -> DecodeError {
    DecodeError::CorruptedFile(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_container() {
        let bytes = b"\0\0\0\x18ftypheic\0\0\0\0mif1heic\0\0\0\x08meta";
        assert!(matches!(
            decode_heic(bytes),
            Err(DecodeError::CorruptedFile(_))
        ));
    }
}
