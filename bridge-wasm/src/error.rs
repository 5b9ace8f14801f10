//! Error types for WebAssembly bridge implementations

use thiserror::Error;
use wasm_bindgen::JsCast;

/// Result type for WebAssembly bridge operations
pub type WasmResult<T> = Result<T, WasmError>;

/// Errors that can occur in WebAssembly bridge implementations
#[derive(Error, Debug)]
pub enum WasmError {
    /// A browser API is missing (no `window`, no `AudioContext`).
    #[error("Browser API unavailable: {0}")]
    NotAvailable(String),

    /// JavaScript error from web-sys
    #[error("JavaScript error: {0}")]
    JavaScript(String),

    /// A JavaScript value had an unexpected type
    #[error("Unexpected JavaScript value: {0}")]
    UnexpectedValue(String),
}

impl WasmError {
    /// Wrap a thrown JavaScript value with the operation that raised it.
    pub fn js(context: &str, value: wasm_bindgen::JsValue) -> Self {
        match WasmError::from(value) {
            WasmError::JavaScript(message) => WasmError::JavaScript(format!("{context}: {message}")),
            other => other,
        }
    }
}

impl From<WasmError> for bridge_traits::error::BridgeError {
    fn from(err: WasmError) -> Self {
        match err {
            WasmError::NotAvailable(what) => bridge_traits::error::BridgeError::NotAvailable(what),
            other => bridge_traits::error::BridgeError::OperationFailed(other.to_string()),
        }
    }
}

impl From<wasm_bindgen::JsValue> for WasmError {
    fn from(js_value: wasm_bindgen::JsValue) -> Self {
        let msg = if js_value.is_string() {
            js_value
                .as_string()
                .unwrap_or_else(|| "Unknown error".to_string())
        } else if let Some(error) = js_value.dyn_ref::<js_sys::Error>() {
            error.message().into()
        } else {
            format!("{:?}", js_value)
        };
        WasmError::JavaScript(msg)
    }
}
