//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the AudioFX core and the host
//! audio stack. Each trait represents a capability that the core requires but
//! that is implemented differently per platform (desktop, web).
//!
//! ## Traits
//!
//! ### Audio
//! - [`AudioBackend`](audio::AudioBackend) - Decoding, output channels, engine clock
//! - [`OutputChannel`](audio::OutputChannel) - Filter → gain chain and playback scheduling
//! - [`GainControl`](audio::GainControl) / [`FilterControl`](audio::FilterControl) - Settable node parameters
//! - [`PlaybackHandle`](audio::PlaybackHandle) - One-shot scheduled playback
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Fetching encoded resources
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ Headless engine |
//! | Web      | `bridge-wasm`       | ✅ Web Audio |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. A host
//! that cannot provide a capability at all (no audio device, no
//! `AudioContext`) reports [`BridgeError::NotAvailable`]; the core surfaces it
//! as a platform-unavailable error.
//!
//! ## Thread Safety
//!
//! On native targets every bridge trait requires `Send + Sync`. On `wasm32`
//! the bounds are relaxed through [`platform::PlatformSendSync`] because
//! browser objects are single-threaded.

pub mod audio;
pub mod error;
pub mod http;
pub mod logging;
pub mod platform;

pub use error::{BridgeError, Result};

// Re-export commonly used types
pub use audio::{
    AudioBackend, DecodedBuffer, FilterControl, FilterType, GainControl, OutputChannel,
    PlaybackHandle, ScheduleRequest,
};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use logging::{LogEntry, LogLevel, LoggerSink};
pub use platform::EndedHandler;
