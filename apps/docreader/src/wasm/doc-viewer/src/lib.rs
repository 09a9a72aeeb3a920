//! Document viewer for DocReader
//!
//! A WASM widget that asks the DocReader server to convert a word-processing
//! document to PDF and shows the result in an `<iframe>`:
//! - one conversion request per opened document, never retried
//! - a loading placeholder, then the PDF or a structured error panel
//! - the PDF lives in a Blob object URL released when the viewer is disposed
//!
//! The lifecycle logic is plain Rust and is tested natively; only
//! `viewer::dom` touches the browser.

use wasm_bindgen::prelude::*;

/// Console logging with a `[DocViewer]` prefix; compiled out off wasm32
macro_rules! log {
    ($($arg:tt)*) => {{
        #[cfg(target_arch = "wasm32")]
        web_sys::console::log_1(&format!("[DocViewer] {}", format_args!($($arg)*)).into());
        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = format_args!($($arg)*);
        }
    }};
}

pub mod envelope;
pub mod filetypes;
pub mod transport;
pub mod viewer;

// Re-export common types
pub use envelope::{ConversionFailure, ConvertedDocument};
pub use transport::{HttpTransport, Transport, TransportClient};
pub use viewer::{ResourceAllocator, Surface, ViewerState, ViewerStateMachine};

#[cfg(target_arch = "wasm32")]
pub use viewer::dom::DocViewer;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    // Set up better panic messages in debug mode
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// File types the viewer handles, for registration with the host
#[wasm_bindgen(js_name = "supportedFileTypes")]
pub fn supported_file_types() -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(&filetypes::file_types())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
