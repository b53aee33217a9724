//! Output dimension calculation.
//!
//! Computes the size of the drawable surface from the source's natural size
//! and an optional maximum-dimension constraint. Results are kept fractional;
//! rounding happens once, when a surface is allocated ([`Dimensions::to_pixels`]).

use serde::{Deserialize, Serialize};

/// Width and height of an image, possibly fractional.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Round to whole pixels for surface allocation.
    ///
    /// Each side is at least one pixel so a very thin image never collapses
    /// into a zero-area surface.
    pub fn to_pixels(self) -> (u32, u32) {
        let round = |v: f64| (v.round() as u32).max(1);
        (round(self.width), round(self.height))
    }
}

/// Compute output dimensions for a source of `width` x `height`.
///
/// # Arguments
///
/// * `width`, `height` - Natural size of the source (must be positive)
/// * `max_width_or_height` - Optional bound on both sides
/// * `maintain_aspect_ratio` - Scale uniformly (`true`) or clamp each side
///   independently (`false`)
///
/// # Behavior
///
/// - No constraint, or both sides already within it: input returned unchanged.
///   Images are never upscaled.
/// - Aspect preserved: both sides multiplied by
///   `min(max / width, max / height)`.
/// - Aspect not preserved: each side clamped to `max`.
pub fn compute_dimensions(
    width: f64,
    height: f64,
    max_width_or_height: Option<f64>,
    maintain_aspect_ratio: bool,
) -> Dimensions {
    let Some(max) = max_width_or_height else {
        return Dimensions::new(width, height);
    };

    if width <= max && height <= max {
        return Dimensions::new(width, height);
    }

    if maintain_aspect_ratio {
        let scale = (max / width).min(max / height);
        Dimensions::new(width * scale, height * scale)
    } else {
        Dimensions::new(width.min(max), height.min(max))
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
