//! Encode side of the raster adapter.
//!
//! This module provides functionality for:
//! - Encoding surfaces to JPEG with a normalized quality parameter
//! - Encoding surfaces to PNG (quality ignored)
//! - Encoding surfaces to WebP, lossy below quality 1.0
//! - The [`SurfaceEncoder`] seam the quality search and orchestrator use
//!
//! # Examples
//!
//! ```ignore
//! use recast_core::encode::encode;
//! use recast_core::OutputFormat;
//!
//! let result = encode(&surface, OutputFormat::Jpeg, 0.8)?;
//! println!("Encoded {} bytes", result.byte_len());
//! ```

mod encoder;
mod jpeg;
mod lossless;
mod types;
mod webp;

pub use encoder::{encode, RasterEncoder, SurfaceEncoder};
pub use jpeg::quality_to_jpeg;
pub use types::{EncodeError, EncodeRequest, EncodeResult, DEFAULT_BACKGROUND};

pub(crate) use types::validate_surface;
