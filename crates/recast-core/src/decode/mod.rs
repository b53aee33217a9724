//! Decode side of the raster adapter.
//!
//! This module provides functionality for:
//! - Selecting a decoder from magic bytes, MIME type or extension
//! - Decoding PNG, JPEG, WebP and GIF sources into an RGBA [`Surface`]
//! - Decoding HEIC/HEIF through libheif, behind the `heic` feature
//! - Applying EXIF orientation for JPEG sources
//! - Resizing surfaces to the dimension calculator's output
//!
//! # Architecture
//!
//! All operations are synchronous and single-threaded. In the browser they
//! run inside a Web Worker, so a long decode does not block the page.
//! Each decode allocates exactly one new surface and never mutates its input.

#[cfg(feature = "heic")]
mod heic;
mod raster;
mod resize;
mod types;

pub use raster::{decode, extract_orientation};
pub use resize::{resize, resize_to_constraint};
pub use types::{DecodeError, FilterType, Orientation, SourceAsset, Surface};
