//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for AudioFX:
//! - Logging and tracing bootstrap
//! - Capability configuration with fail-fast validation
//!
//! ## Overview
//!
//! Host applications build an [`AudioFxConfig`](config::AudioFxConfig) once
//! at startup, optionally call [`init_logging`](logging::init_logging), and
//! hand the configuration to `core_playback::AudioFx`.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{AudioFxConfig, AudioFxConfigBuilder};
pub use error::{Error, Result};
