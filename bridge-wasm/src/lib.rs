//! WebAssembly Bridge Implementations
//!
//! This crate provides WebAssembly-compatible implementations of the bridge traits
//! defined in `bridge-traits`. These implementations use browser APIs through
//! `web-sys` and `wasm-bindgen`.
//!
//! # Platform Support
//!
//! This crate is designed exclusively for the `wasm32-unknown-unknown` target.
//! It will not compile for native targets.
//!
//! # Implementations
//!
//! - `WebAudioBackend`: decoding and playback through a browser `AudioContext`
//! - `WasmHttpClient`: resource fetching through `window.fetch`
//!
//! # Examples
//!
//! ```ignore
//! use bridge_wasm::{WasmHttpClient, WebAudioBackend};
//! use core_runtime::config::AudioFxConfig;
//! use std::sync::Arc;
//!
//! let config = AudioFxConfig::builder()
//!     .backend(Arc::new(WebAudioBackend::new()?))
//!     .http_client(Arc::new(WasmHttpClient::new()?))
//!     .build()?;
//! ```

#![cfg(target_arch = "wasm32")]
#![warn(missing_docs)]

pub mod error;
pub mod http;
pub mod web_audio;

// Re-export commonly used types
pub use error::{WasmError, WasmResult};
pub use http::{WasmHttpClient, DEFAULT_TIMEOUT};
pub use web_audio::WebAudioBackend;
