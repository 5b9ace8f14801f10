//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! This crate provides implementations of the bridge traits using
//! desktop-appropriate libraries:
//! - `HttpClient` using `reqwest`
//! - `AudioBackend` as a headless engine: Symphonia decoding plus a tokio
//!   timer standing in for the output device
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{HeadlessAudioBackend, ReqwestHttpClient};
//! use core_runtime::config::AudioFxConfig;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AudioFxConfig::builder()
//!         .backend(Arc::new(HeadlessAudioBackend::new()))
//!         .http_client(Arc::new(ReqwestHttpClient::new()?))
//!         .build()?;
//!     Ok(())
//! }
//! ```

mod decoder;
mod headless;
mod http;

pub use decoder::SymphoniaDecoder;
pub use headless::{HeadlessAudioBackend, DEFAULT_SAMPLE_RATE};
pub use http::ReqwestHttpClient;
