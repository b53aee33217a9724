//! Format and dimension helpers that need no converter state.
//!
//! The upload surface uses these before starting a conversion: to label a
//! dropped file, to preview output dimensions and to name the download.

use crate::convert::parse_format;
use crate::types::JsDimensions;
use recast_core::{dimensions, format, SourceAsset};
use wasm_bindgen::prelude::*;

/// Output dimensions for a `width` x `height` source.
///
/// Never upscales. Pass `undefined` for `maxWidthOrHeight` to keep the
/// source size.
#[wasm_bindgen(js_name = computeDimensions)]
pub fn compute_dimensions(
    width: f64,
    height: f64,
    max_width_or_height: Option<f64>,
    maintain_aspect_ratio: bool,
) -> JsDimensions {
    dimensions::compute_dimensions(width, height, max_width_or_height, maintain_aspect_ratio).into()
}

/// MIME type of the image format detected from the leading bytes, falling
/// back to the declared MIME type and then the file extension.
///
/// Returns `undefined` when the format is not recognized.
#[wasm_bindgen(js_name = detectFormat)]
pub fn detect_format(bytes: &[u8], file_name: Option<String>, mime_type: Option<String>) -> Option<String> {
    let name = file_name.unwrap_or_default();
    let mut asset = SourceAsset::new(bytes, &name);
    if let Some(mime) = mime_type.as_deref() {
        asset = asset.with_mime_type(mime);
    }
    asset.format().map(|f| f.mime_type().to_string())
}

/// Download name for `original` re-encoded as `targetFormat`.
#[wasm_bindgen(js_name = outputFileName)]
pub fn output_file_name(original: &str, target_format: &str) -> Result<String, JsValue> {
    let format = parse_format(target_format).map_err(|e| JsValue::from_str(&e))?;
    Ok(format::output_file_name(original, format))
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn test_output_file_name_unknown_format() {
        assert!(output_file_name("holiday.png", "tiff").is_err());
    }
}
