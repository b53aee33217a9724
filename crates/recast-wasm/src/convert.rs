//! Conversion WASM bindings.
//!
//! Exposes the core orchestrator as a `Converter` class. Each instance owns
//! the object URLs it hands out, so revoking and cleanup go through it.
//!
//! # Example
//!
//! ```typescript
//! import { Converter } from '@recast/wasm';
//!
//! const converter = new Converter();
//! const bytes = new Uint8Array(await file.arrayBuffer());
//!
//! const result = converter.compressToTarget(
//!   bytes,
//!   file.name,
//!   file.type,
//!   { target: { mode: 'filesize', value: 200 }, maxWidthOrHeight: 1920 },
//!   (stage, pass) => console.log(stage, pass),
//! );
//! preview.src = result.url;
//!
//! // later
//! converter.revoke(result.url);
//! ```

use crate::resource::BrowserBackend;
use crate::types::JsConversionResult;
use js_sys::Function;
use recast_core::{
    CompressOptions, ConversionError, ConvertOptions, Converter, OutputFormat, ResourceManager,
    SearchConfig, SourceAsset, Stage,
};
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;

/// Stateful converter that tracks every object URL it creates.
///
/// Options objects are plain JS objects using camelCase keys. Missing keys
/// take their defaults, and `undefined` or `null` means all defaults.
#[wasm_bindgen(js_name = Converter)]
pub struct JsConverter {
    converter: Converter,
    resources: ResourceManager<BrowserBackend>,
}

#[wasm_bindgen(js_class = Converter)]
impl JsConverter {
    /// Create a converter, optionally overriding the size search settings
    /// (`minQuality`, `maxQuality`, `initialQuality`, `maxAttempts`,
    /// `tolerance`).
    #[wasm_bindgen(constructor)]
    pub fn new(search_config: JsValue) -> Result<JsConverter, JsValue> {
        let search: SearchConfig = from_js_or_default(search_config)?;
        search.validate().map_err(to_js_error)?;

        Ok(JsConverter {
            converter: Converter::new().with_search_config(search),
            resources: ResourceManager::new(BrowserBackend),
        })
    }

    /// Re-encode an image into `targetFormat` (`png`, `jpeg`, `jpg` or
    /// `webp`).
    ///
    /// `onProgress` is called as `(stage, pass)` where `pass` is only set
    /// for the `encoding` stage.
    #[wasm_bindgen(js_name = convertFormat)]
    pub fn convert_format(
        &mut self,
        bytes: &[u8],
        file_name: &str,
        mime_type: Option<String>,
        target_format: &str,
        options: JsValue,
        on_progress: Option<Function>,
    ) -> Result<JsConversionResult, JsValue> {
        let format = parse_format(target_format).map_err(|e| JsValue::from_str(&e))?;
        let options: ConvertOptions = from_js_or_default(options)?;
        let asset = source_asset(bytes, file_name, mime_type.as_deref());

        let mut on_stage = progress_observer(on_progress.as_ref());
        self.converter
            .convert_format_with_progress(&asset, format, &options, &mut self.resources, &mut on_stage)
            .map(JsConversionResult::from_result)
            .map_err(|e| conversion_error(&e))
    }

    /// Compress an image toward a quality preset or a target size in KB.
    ///
    /// `options.target` is `{ mode: 'quality' | 'filesize' | 'custom', value }`.
    #[wasm_bindgen(js_name = compressToTarget)]
    pub fn compress_to_target(
        &mut self,
        bytes: &[u8],
        file_name: &str,
        mime_type: Option<String>,
        options: JsValue,
        on_progress: Option<Function>,
    ) -> Result<JsConversionResult, JsValue> {
        let options: CompressOptions = from_js_or_default(options)?;
        let asset = source_asset(bytes, file_name, mime_type.as_deref());

        let mut on_stage = progress_observer(on_progress.as_ref());
        self.converter
            .compress_to_target_with_progress(&asset, &options, &mut self.resources, &mut on_stage)
            .map(JsConversionResult::from_result)
            .map_err(|e| conversion_error(&e))
    }

    /// Release one object URL. Returns false if it was unknown or already
    /// released.
    pub fn revoke(&mut self, url: &str) -> bool {
        self.resources.revoke_url(url)
    }

    /// Release every object URL this converter still holds.
    #[wasm_bindgen(js_name = revokeAll)]
    pub fn revoke_all(&mut self) -> usize {
        self.resources.revoke_all()
    }

    #[wasm_bindgen(getter, js_name = liveHandles)]
    pub fn live_handles(&self) -> usize {
        self.resources.live_count()
    }
}

impl Drop for JsConverter {
    fn drop(&mut self) {
        let live = self.resources.live_count();
        if live > 0 {
            web_sys::console::warn_1(&JsValue::from_str(&format!(
                "Converter freed with {} live object URL(s); revoking",
                live
            )));
        }
    }
}

fn source_asset<'a>(bytes: &'a [u8], file_name: &'a str, mime_type: Option<&'a str>) -> SourceAsset<'a> {
    let asset = SourceAsset::new(bytes, file_name);
    match mime_type.filter(|m| !m.is_empty()) {
        Some(mime) => asset.with_mime_type(mime),
        None => asset,
    }
}

pub(crate) fn parse_format(name: &str) -> Result<OutputFormat, String> {
    name.parse::<OutputFormat>().map_err(|e| e.to_string())
}

fn from_js_or_default<T: DeserializeOwned + Default>(value: JsValue) -> Result<T, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(T::default());
    }
    serde_wasm_bindgen::from_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn to_js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn conversion_error(e: &ConversionError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Forward stage changes to an optional JS callback. A throwing callback
/// is logged and otherwise ignored.
fn progress_observer(callback: Option<&Function>) -> impl FnMut(Stage) + '_ {
    move |stage| {
        let Some(callback) = callback else {
            return;
        };
        let pass = match stage {
            Stage::Encoding(n) => JsValue::from(n),
            _ => JsValue::UNDEFINED,
        };
        if let Err(e) = callback.call2(&JsValue::NULL, &JsValue::from_str(stage.name()), &pass) {
            web_sys::console::warn_2(&JsValue::from_str("Progress callback threw"), &e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format_aliases() {
        assert_eq!(parse_format("png"), Ok(OutputFormat::Png));
        assert_eq!(parse_format("jpg"), Ok(OutputFormat::Jpeg));
        assert_eq!(parse_format("image/webp"), Ok(OutputFormat::WebP));
    }

    #[test]
    fn test_parse_format_unknown() {
        let err = parse_format("bmp").unwrap_err();
        assert!(err.contains("bmp"));
    }

    #[test]
    fn test_source_asset_ignores_empty_mime() {
        let asset = source_asset(&[1, 2, 3], "photo.jpg", Some(""));
        assert_eq!(asset.mime_type, None);

        let asset = source_asset(&[1, 2, 3], "photo", Some("image/png"));
        assert_eq!(asset.mime_type, Some("image/png"));
    }
}
