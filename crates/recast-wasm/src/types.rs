//! WASM-compatible wrapper types.
//!
//! These wrap the core result types and expose them to JavaScript through
//! getters, converting Rust enums and options into plain JS values.

use recast_core::{ConversionResult, Dimensions};
use wasm_bindgen::prelude::*;

/// Result of a conversion, as seen from JavaScript.
///
/// # Memory Management
///
/// The encoded bytes live in WASM memory and in the blob behind `url`.
/// `bytes()` copies them into a `Uint8Array`. When the preview or download
/// is finished, pass `url` to `Converter.revoke` to release the blob.
#[wasm_bindgen]
pub struct JsConversionResult {
    inner: ConversionResult,
}

#[wasm_bindgen]
impl JsConversionResult {
    /// Object URL of the encoded output.
    #[wasm_bindgen(getter)]
    pub fn url(&self) -> String {
        self.inner.handle.url().to_string()
    }

    #[wasm_bindgen(getter, js_name = fileName)]
    pub fn file_name(&self) -> String {
        self.inner.file_name.clone()
    }

    #[wasm_bindgen(getter, js_name = originalSize)]
    pub fn original_size(&self) -> usize {
        self.inner.original_size
    }

    #[wasm_bindgen(getter, js_name = convertedSize)]
    pub fn converted_size(&self) -> usize {
        self.inner.converted_size
    }

    /// Output format name: `png`, `jpeg` or `webp`.
    #[wasm_bindgen(getter)]
    pub fn format(&self) -> String {
        self.inner.format.to_string()
    }

    #[wasm_bindgen(getter, js_name = mimeType)]
    pub fn mime_type(&self) -> String {
        self.inner.format.mime_type().to_string()
    }

    /// Percent saved. Negative when the output is larger than the input.
    #[wasm_bindgen(getter, js_name = compressionRatio)]
    pub fn compression_ratio(&self) -> f64 {
        self.inner.compression_ratio
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.inner.height
    }

    /// Quality of the final encode, in [0, 1].
    #[wasm_bindgen(getter)]
    pub fn quality(&self) -> f64 {
        self.inner.quality
    }

    #[wasm_bindgen(getter, js_name = encodePasses)]
    pub fn encode_passes(&self) -> u32 {
        self.inner.encode_passes
    }

    /// Search probes issued, or `undefined` if no search ran.
    #[wasm_bindgen(getter)]
    pub fn attempts(&self) -> Option<u32> {
        self.inner.search.map(|s| s.attempts)
    }

    /// Whether the size search hit its tolerance band, or `undefined` if
    /// no search ran.
    #[wasm_bindgen(getter)]
    pub fn converged(&self) -> Option<bool> {
        self.inner.search.map(|s| s.converged)
    }

    /// Copy of the encoded bytes as a `Uint8Array`.
    pub fn bytes(&self) -> Vec<u8> {
        self.inner.output.bytes().to_vec()
    }
}

impl JsConversionResult {
    pub(crate) fn from_result(inner: ConversionResult) -> Self {
        Self { inner }
    }
}

/// Output of `computeDimensions`. Values may be fractional.
#[wasm_bindgen]
#[derive(Debug, Clone, Copy)]
pub struct JsDimensions {
    pub width: f64,
    pub height: f64,
}

#[wasm_bindgen]
impl JsDimensions {
    /// Width rounded for surface allocation.
    #[wasm_bindgen(getter, js_name = pixelWidth)]
    pub fn pixel_width(&self) -> u32 {
        Dimensions::new(self.width, self.height).to_pixels().0
    }

    /// Height rounded for surface allocation.
    #[wasm_bindgen(getter, js_name = pixelHeight)]
    pub fn pixel_height(&self) -> u32 {
        Dimensions::new(self.width, self.height).to_pixels().1
    }
}

impl From<Dimensions> for JsDimensions {
    fn from(dims: Dimensions) -> Self {
        Self {
            width: dims.width,
            height: dims.height,
        }
    }
}
