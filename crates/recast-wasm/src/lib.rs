//! Recast WASM - WebAssembly bindings for Recast
//!
//! This crate exposes the recast-core conversion pipeline to JavaScript and
//! TypeScript. Output bytes are published as object URLs that the page can
//! use for previews and downloads.
//!
//! # Module Structure
//!
//! - `convert` - The `Converter` class: format conversion, size-targeted
//!   compression and object URL lifecycle
//! - `format` - Stateless helpers (dimension preview, format detection,
//!   download names)
//! - `resource` - Object URL backend for the core resource manager
//! - `types` - WASM-compatible wrapper types for results
//!
//! # Usage
//!
//! ```typescript
//! import init, { Converter } from '@recast/wasm';
//!
//! // Initialize WASM module (must call first)
//! await init();
//!
//! const converter = new Converter();
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const result = converter.convertFormat(bytes, file.name, file.type, 'webp');
//! console.log(`${result.originalSize} -> ${result.convertedSize} bytes`);
//! ```
//!
//! Call this from a Web Worker; conversions run synchronously.

use wasm_bindgen::prelude::*;

mod convert;
mod format;
mod resource;
mod types;

// Re-export public types
pub use convert::JsConverter;
pub use format::{compute_dimensions, detect_format, output_file_name};
pub use resource::BrowserBackend;
pub use types::{JsConversionResult, JsDimensions};

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
