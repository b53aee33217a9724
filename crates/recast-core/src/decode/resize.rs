//! Surface resizing.
//!
//! Resizing never modifies its input; a new surface sized to the target
//! dimensions is allocated.

use super::{DecodeError, FilterType, Surface};
use crate::dimensions::{compute_dimensions, Dimensions};

/// Resize a surface to exact pixel dimensions.
///
/// # Errors
///
/// Returns `DecodeError::EmptyImage` for a zero target size and
/// `DecodeError::CorruptedFile` if the pixel buffer does not match the
/// surface's dimensions.
pub fn resize(
    surface: &Surface,
    width: u32,
    height: u32,
    filter: FilterType,
) -> Result<Surface, DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::EmptyImage { width, height });
    }

    let source = surface
        .as_rgba_image()
        .ok_or_else(|| DecodeError::CorruptedFile("Pixel buffer size mismatch".to_string()))?;

    if surface.width == width && surface.height == height {
        return Ok(surface.clone());
    }

    let resized = image::imageops::resize(&source, width, height, filter.to_image_filter());
    Ok(Surface::from_rgba_image(resized))
}

/// Resize a surface per the dimension calculator's rules.
///
/// Returns `None` when the constraint leaves the surface unchanged, so the
/// caller can keep using the decoded surface without a copy.
pub fn resize_to_constraint(
    surface: &Surface,
    max_width_or_height: Option<u32>,
    maintain_aspect_ratio: bool,
    filter: FilterType,
) -> Result<Option<Surface>, DecodeError> {
    let target: Dimensions = compute_dimensions(
        surface.width as f64,
        surface.height as f64,
        max_width_or_height.map(f64::from),
        maintain_aspect_ratio,
    );
    let (width, height) = target.to_pixels();

    if (width, height) == surface.dimensions() {
        return Ok(None);
    }

    resize(surface, width, height, filter).map(Some)
}
