//! Recast Core - adaptive raster re-encoding pipeline
//!
//! This crate takes an arbitrary input image, decodes it, optionally resizes
//! it, and re-encodes it to a target format. For compression it searches for
//! the encoder quality that best satisfies a target output size.
//!
//! # Module Structure
//!
//! - `dimensions` - Output size calculation (no upscaling, aspect-preserving)
//! - `resource` - Lifecycle tracking for transient output handles
//! - `decode` / `encode` - The raster adapter over the `image` crate codecs
//! - `search` - Bisection over encoder quality toward a byte target
//! - `convert` - The orchestrator: `convert_format` and `compress_to_target`
//!
//! # Example
//!
//! ```ignore
//! use recast_core::{
//!     compress_to_target, CompressOptions, CompressionTarget, MemoryBackend, ResourceManager,
//!     SourceAsset,
//! };
//!
//! let mut resources = ResourceManager::new(MemoryBackend::new());
//! let asset = SourceAsset::new(&bytes, "holiday.jpg");
//! let options = CompressOptions::new(CompressionTarget::ByFileSize(200.0));
//! let result = compress_to_target(&asset, &options, &mut resources)?;
//! println!("{} -> {} bytes", result.original_size, result.converted_size);
//! resources.revoke(&result.handle);
//! ```

pub mod convert;
pub mod decode;
pub mod dimensions;
pub mod encode;
pub mod format;
pub mod resource;
pub mod search;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use convert::{
    compression_ratio, CompressOptions, CompressionTarget, ConversionError, ConversionResult,
    ConvertOptions, Converter, Stage,
};
pub use decode::{DecodeError, FilterType, SourceAsset, Surface};
pub use dimensions::{compute_dimensions, Dimensions};
pub use encode::{EncodeError, EncodeRequest, EncodeResult, RasterEncoder, SurfaceEncoder};
pub use format::{output_file_name, OutputFormat, SourceFormat, UnknownFormat};
pub use resource::{MemoryBackend, ResourceBackend, ResourceError, ResourceHandle, ResourceManager};
pub use search::{search_quality, SearchConfig, SearchConfigError, SearchOutcome};

/// Re-encode `asset` into `format` with the built-in codecs.
///
/// See [`Converter::convert_format`].
pub fn convert_format<B: ResourceBackend>(
    asset: &SourceAsset<'_>,
    format: OutputFormat,
    options: &ConvertOptions,
    resources: &mut ResourceManager<B>,
) -> Result<ConversionResult, ConversionError> {
    Converter::new().convert_format(asset, format, options, resources)
}

/// Compress `asset` toward a quality preset or target size with the
/// built-in codecs and default search settings.
///
/// See [`Converter::compress_to_target`].
pub fn compress_to_target<B: ResourceBackend>(
    asset: &SourceAsset<'_>,
    options: &CompressOptions,
    resources: &mut ResourceManager<B>,
) -> Result<ConversionResult, ConversionError> {
    Converter::new().compress_to_target(asset, options, resources)
}
