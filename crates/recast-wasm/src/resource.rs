//! Browser resource backend.
//!
//! Output bytes are wrapped in a `Blob` and exposed through
//! `URL.createObjectURL`, which the page uses for previews and downloads.
//! Revoking calls `URL.revokeObjectURL` so the browser can free the blob.

use js_sys::{Array, Uint8Array};
use recast_core::{ResourceBackend, ResourceError};
use wasm_bindgen::JsValue;
use web_sys::{Blob, BlobPropertyBag, Url};

/// [`ResourceBackend`] backed by object URLs.
#[derive(Debug, Default)]
pub struct BrowserBackend;

impl ResourceBackend for BrowserBackend {
    fn create(&mut self, bytes: &[u8], mime_type: &str) -> Result<String, ResourceError> {
        let array = Uint8Array::from(bytes);
        let parts = Array::of1(&array);

        let options = BlobPropertyBag::new();
        options.set_type(mime_type);

        let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options)
            .map_err(create_failed)?;
        Url::create_object_url_with_blob(&blob).map_err(create_failed)
    }

    fn revoke(&mut self, url: &str) {
        if let Err(e) = Url::revoke_object_url(url) {
            web_sys::console::warn_2(&JsValue::from_str("Failed to revoke object URL"), &e);
        }
    }
}

fn create_failed(err: JsValue) -> ResourceError {
    ResourceError::CreateFailed(err.as_string().unwrap_or_else(|| format!("{:?}", err)))
}

/// WASM-specific tests; object URLs only exist in a browser.
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use recast_core::{MemoryBackend, ResourceManager};
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_create_object_url() {
        let mut backend = BrowserBackend;
        let url = backend.create(&[1, 2, 3], "image/png").unwrap();
        assert!(url.starts_with("blob:"));
        backend.revoke(&url);
    }

    #[wasm_bindgen_test]
    fn test_manager_balance_with_browser_backend() {
        let mut manager = ResourceManager::new(BrowserBackend);
        let first = manager.create(&[1, 2, 3], "image/jpeg").unwrap();
        let second = manager.replace(Some(&first), &[4, 5], "image/jpeg").unwrap();

        assert!(!manager.is_live(&first));
        assert!(manager.is_live(&second));
        assert_eq!(manager.live_count(), 1);
        assert!(manager.revoke(&second));
        assert_eq!(manager.live_count(), 0);

        // Same bookkeeping as the in-memory backend
        let mut memory = ResourceManager::new(MemoryBackend::new());
        let a = memory.create(&[1], "image/png").unwrap();
        memory.replace(Some(&a), &[2], "image/png").unwrap();
        assert_eq!(memory.live_count(), manager.live_count() + 1);
    }
}
