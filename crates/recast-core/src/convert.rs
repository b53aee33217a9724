//! Conversion orchestrator.
//!
//! Composes decode, resize, encode and the quality search into the two
//! end-to-end operations: [`Converter::convert_format`] and
//! [`Converter::compress_to_target`].
//!
//! Each call walks the same state machine:
//!
//! ```text
//! Idle -> Decoding -> (Resizing) -> Encoding[1..n] -> Packaging -> Done | Failed
//! ```
//!
//! Calls share no mutable state. The surfaces a call creates are owned by
//! that call and dropped before it returns. The only handle a call creates
//! is the output handle, allocated as the very last step, so a failed call
//! never leaves a live handle behind.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::decode::{self, DecodeError, FilterType, SourceAsset, Surface};
use crate::encode::{
    EncodeError, EncodeRequest, EncodeResult, RasterEncoder, SurfaceEncoder, DEFAULT_BACKGROUND,
};
use crate::format::{output_file_name, OutputFormat};
use crate::resource::{ResourceBackend, ResourceError, ResourceHandle, ResourceManager};
use crate::search::{search_encoder_quality, SearchConfig, SearchOutcome};

/// Errors surfaced to callers of the orchestrator.
///
/// User-facing code shows every variant as a single "conversion failed"
/// message; the variants are kept for diagnostics.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Encode failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("Could not create output handle: {0}")]
    Resource(#[from] ResourceError),

    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

impl ConversionError {
    pub fn is_decode(&self) -> bool {
        matches!(self, ConversionError::Decode(_))
    }

    pub fn is_encode(&self) -> bool {
        matches!(self, ConversionError::Encode(_))
    }
}

/// Pipeline stage reported to progress observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Decoding,
    Resizing,
    /// Encode pass number, starting at 1.
    Encoding(u32),
    Packaging,
    Done,
    Failed,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Decoding => "decoding",
            Stage::Resizing => "resizing",
            Stage::Encoding(_) => "encoding",
            Stage::Packaging => "packaging",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}

/// How `compress_to_target` picks the encoder quality.
///
/// Serialized as `{ "mode": "quality" | "filesize" | "custom", "value": n }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value")]
pub enum CompressionTarget {
    /// Preset quality, 0-100.
    #[serde(rename = "quality")]
    ByQuality(f64),
    /// Target output size in KiB; quality is searched for.
    #[serde(rename = "filesize")]
    ByFileSize(f64),
    /// User-entered quality, 0-100.
    #[serde(rename = "custom")]
    Custom(f64),
}

impl Default for CompressionTarget {
    fn default() -> Self {
        CompressionTarget::ByQuality(80.0)
    }
}

impl CompressionTarget {
    fn validate(self) -> Result<(), ConversionError> {
        match self {
            CompressionTarget::ByQuality(q) | CompressionTarget::Custom(q) => {
                if !(0.0..=100.0).contains(&q) {
                    return Err(ConversionError::InvalidOptions(format!(
                        "quality {} must lie within [0, 100]",
                        q
                    )));
                }
            }
            CompressionTarget::ByFileSize(kb) => {
                if !(kb.is_finite() && kb > 0.0) {
                    return Err(ConversionError::InvalidOptions(format!(
                        "target size {} KB must be a positive number",
                        kb
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Options for [`Converter::convert_format`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConvertOptions {
    /// Quality in [0, 1]; the format's default when absent.
    pub quality: Option<f64>,
    pub max_width_or_height: Option<u32>,
    pub maintain_aspect_ratio: bool,
    pub filter: FilterType,
    /// Fill for transparent pixels when the output has no alpha.
    pub background: [u8; 3],
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            quality: None,
            max_width_or_height: None,
            maintain_aspect_ratio: true,
            filter: FilterType::default(),
            background: DEFAULT_BACKGROUND,
        }
    }
}

/// Options for [`Converter::compress_to_target`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompressOptions {
    pub target: CompressionTarget,
    /// Output format; defaults to the source's format, or JPEG when the
    /// source format cannot be encoded (GIF, HEIC).
    pub format: Option<OutputFormat>,
    pub max_width_or_height: Option<u32>,
    pub maintain_aspect_ratio: bool,
    pub filter: FilterType,
    pub background: [u8; 3],
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            target: CompressionTarget::default(),
            format: None,
            max_width_or_height: None,
            maintain_aspect_ratio: true,
            filter: FilterType::default(),
            background: DEFAULT_BACKGROUND,
        }
    }
}

impl CompressOptions {
    pub fn new(target: CompressionTarget) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }
}

/// Outcome of a successful conversion. Owned by the caller, who must
/// release `handle` through the resource manager once it is no longer
/// displayed or downloaded.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// Live reference to the encoded bytes.
    pub handle: ResourceHandle,
    /// The bytes of the final encode pass.
    pub output: EncodeResult,
    pub file_name: String,
    pub original_size: usize,
    pub converted_size: usize,
    pub format: OutputFormat,
    /// Percent saved; negative when the output grew.
    pub compression_ratio: f64,
    pub width: u32,
    pub height: u32,
    /// Quality of the final encode pass.
    pub quality: f64,
    /// Total encode calls, probes included.
    pub encode_passes: u32,
    /// Present when the quality was searched for.
    pub search: Option<SearchOutcome>,
}

/// `(original - converted) / original * 100`, reported as-is.
///
/// Negative when the conversion increased the size. An empty original
/// yields 0.
pub fn compression_ratio(original_size: usize, converted_size: usize) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    let original = original_size as f64;
    (original - converted_size as f64) / original * 100.0
}

/// Per-call stage tracking.
struct Run<'a> {
    stage: Stage,
    encode_passes: u32,
    observer: &'a mut dyn FnMut(Stage),
}

impl<'a> Run<'a> {
    fn new(observer: &'a mut dyn FnMut(Stage)) -> Self {
        Self {
            stage: Stage::Idle,
            encode_passes: 0,
            observer,
        }
    }

    fn begin_encode(&mut self) {
        self.encode_passes += 1;
        self.enter(Stage::Encoding(self.encode_passes));
    }

    fn enter(&mut self, stage: Stage) {
        debug_assert!(!self.stage.is_terminal(), "stage after terminal state");
        debug!(from = self.stage.name(), to = stage.name(), "pipeline stage");
        self.stage = stage;
        (self.observer)(stage);
    }

    fn finish<T>(mut self, result: Result<T, ConversionError>) -> Result<T, ConversionError> {
        match &result {
            Ok(_) => self.enter(Stage::Done),
            Err(e) => {
                warn!(stage = self.stage.name(), error = %e, "conversion failed");
                self.enter(Stage::Failed);
            }
        }
        result
    }
}

/// Encode parameters shared by both entry points.
struct Shape {
    max_width_or_height: Option<u32>,
    maintain_aspect_ratio: bool,
    filter: FilterType,
}

/// The orchestrator. Holds only configuration; every call is independent.
#[derive(Debug, Clone, Default)]
pub struct Converter<E = RasterEncoder> {
    encoder: E,
    search: SearchConfig,
}

impl Converter<RasterEncoder> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E: SurfaceEncoder> Converter<E> {
    /// Use a custom encoder.
    pub fn with_encoder(encoder: E) -> Self {
        Self {
            encoder,
            search: SearchConfig::default(),
        }
    }

    pub fn with_search_config(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    pub fn search_config(&self) -> &SearchConfig {
        &self.search
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Decode, resize and re-encode once into `format`.
    ///
    /// Never retries; any decode or encode failure ends the call.
    pub fn convert_format<B: ResourceBackend>(
        &self,
        asset: &SourceAsset<'_>,
        format: OutputFormat,
        options: &ConvertOptions,
        resources: &mut ResourceManager<B>,
    ) -> Result<ConversionResult, ConversionError> {
        self.convert_format_with_progress(asset, format, options, resources, &mut |_| {})
    }

    /// [`convert_format`](Self::convert_format), reporting each stage.
    pub fn convert_format_with_progress<B: ResourceBackend>(
        &self,
        asset: &SourceAsset<'_>,
        format: OutputFormat,
        options: &ConvertOptions,
        resources: &mut ResourceManager<B>,
        on_stage: &mut dyn FnMut(Stage),
    ) -> Result<ConversionResult, ConversionError> {
        let mut run = Run::new(on_stage);
        let result = self.run_convert(&mut run, asset, format, options, resources);
        run.finish(result)
    }

    /// Re-encode toward a quality preset or a target file size.
    pub fn compress_to_target<B: ResourceBackend>(
        &self,
        asset: &SourceAsset<'_>,
        options: &CompressOptions,
        resources: &mut ResourceManager<B>,
    ) -> Result<ConversionResult, ConversionError> {
        self.compress_to_target_with_progress(asset, options, resources, &mut |_| {})
    }

    /// [`compress_to_target`](Self::compress_to_target), reporting each stage.
    pub fn compress_to_target_with_progress<B: ResourceBackend>(
        &self,
        asset: &SourceAsset<'_>,
        options: &CompressOptions,
        resources: &mut ResourceManager<B>,
        on_stage: &mut dyn FnMut(Stage),
    ) -> Result<ConversionResult, ConversionError> {
        let mut run = Run::new(on_stage);
        let result = self.run_compress(&mut run, asset, options, resources);
        run.finish(result)
    }

    fn run_convert<B: ResourceBackend>(
        &self,
        run: &mut Run<'_>,
        asset: &SourceAsset<'_>,
        format: OutputFormat,
        options: &ConvertOptions,
        resources: &mut ResourceManager<B>,
    ) -> Result<ConversionResult, ConversionError> {
        if let Some(q) = options.quality.filter(|q| !(0.0..=1.0).contains(q)) {
            return Err(ConversionError::InvalidOptions(format!(
                "quality {} must lie within [0, 1]",
                q
            )));
        }
        let shape = Shape {
            max_width_or_height: options.max_width_or_height,
            maintain_aspect_ratio: options.maintain_aspect_ratio,
            filter: options.filter,
        };
        let surface = self.prepare_surface(run, asset, &shape)?;

        let quality = options.quality.unwrap_or_else(|| format.default_quality());
        run.begin_encode();
        let request = EncodeRequest::new(&surface, format, quality).with_background(options.background);
        let output = self.encoder.encode(&request)?;
        let quality = request.effective_quality();
        let dimensions = surface.dimensions();
        drop(surface);

        run.enter(Stage::Packaging);
        package(asset, output, dimensions, quality, run.encode_passes, None, resources)
    }

    fn run_compress<B: ResourceBackend>(
        &self,
        run: &mut Run<'_>,
        asset: &SourceAsset<'_>,
        options: &CompressOptions,
        resources: &mut ResourceManager<B>,
    ) -> Result<ConversionResult, ConversionError> {
        options.target.validate()?;
        self.search
            .validate()
            .map_err(|e| ConversionError::InvalidOptions(e.to_string()))?;

        let format = options
            .format
            .or_else(|| asset.format().and_then(|f| f.as_output()))
            .unwrap_or(OutputFormat::Jpeg);
        let shape = Shape {
            max_width_or_height: options.max_width_or_height,
            maintain_aspect_ratio: options.maintain_aspect_ratio,
            filter: options.filter,
        };
        let surface = self.prepare_surface(run, asset, &shape)?;

        let (quality, search) = match options.target {
            CompressionTarget::ByQuality(q) | CompressionTarget::Custom(q) => (q / 100.0, None),
            CompressionTarget::ByFileSize(_) if !format.is_lossy() => {
                debug!(%format, "quality has no effect on a lossless format; skipping search");
                (format.default_quality(), None)
            }
            CompressionTarget::ByFileSize(kb) => {
                let target_bytes = (kb * 1024.0).round() as u64;
                let outcome = search_encoder_quality(
                    &self.encoder,
                    &surface,
                    format,
                    options.background,
                    target_bytes,
                    &self.search,
                    &mut |_| run.begin_encode(),
                )?;
                (outcome.quality, Some(outcome))
            }
        };

        // The definitive pass; probe outputs were discarded as they were measured.
        run.begin_encode();
        let request = EncodeRequest::new(&surface, format, quality).with_background(options.background);
        let output = self.encoder.encode(&request)?;
        let quality = request.effective_quality();
        let dimensions = surface.dimensions();
        drop(surface);

        run.enter(Stage::Packaging);
        package(asset, output, dimensions, quality, run.encode_passes, search, resources)
    }

    /// Decode and, if the constraint requires it, resize.
    ///
    /// The natural-size surface is dropped as soon as the resized one exists.
    fn prepare_surface(
        &self,
        run: &mut Run<'_>,
        asset: &SourceAsset<'_>,
        shape: &Shape,
    ) -> Result<Surface, ConversionError> {
        run.enter(Stage::Decoding);
        let decoded = decode::decode(asset)?;
        debug!(
            width = decoded.width,
            height = decoded.height,
            file = asset.file_name,
            "decoded source"
        );

        let needs_resize = shape
            .max_width_or_height
            .is_some_and(|max| decoded.width > max || decoded.height > max);
        if !needs_resize {
            return Ok(decoded);
        }

        run.enter(Stage::Resizing);
        let resized = decode::resize_to_constraint(
            &decoded,
            shape.max_width_or_height,
            shape.maintain_aspect_ratio,
            shape.filter,
        )?;
        Ok(resized.unwrap_or(decoded))
    }
}

/// Register the output handle and assemble the result.
///
/// Handle creation is the last fallible step, so nothing needs unwinding
/// if it fails.
fn package<B: ResourceBackend>(
    asset: &SourceAsset<'_>,
    output: EncodeResult,
    (width, height): (u32, u32),
    quality: f64,
    encode_passes: u32,
    search: Option<SearchOutcome>,
    resources: &mut ResourceManager<B>,
) -> Result<ConversionResult, ConversionError> {
    let format = output.format();
    let original_size = asset.byte_len();
    let converted_size = output.byte_len();
    let handle = resources.create(output.bytes(), format.mime_type())?;

    let result = ConversionResult {
        handle,
        file_name: output_file_name(asset.file_name, format),
        original_size,
        converted_size,
        format,
        compression_ratio: compression_ratio(original_size, converted_size),
        width,
        height,
        quality,
        encode_passes,
        search,
        output,
    };
    info!(
        file = %result.file_name,
        original = original_size,
        converted = converted_size,
        ratio = result.compression_ratio,
        passes = encode_passes,
        "conversion complete"
    );
    Ok(result)
}
