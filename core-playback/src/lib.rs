//! # AudioFX Playback Core
//!
//! Loads remote audio resources into shared decoded buffers and drives a
//! small play / pause / stop state machine per sound.
//!
//! ## Overview
//!
//! This module handles:
//! - A URL-keyed buffer cache that decodes each resource once
//! - Per-sound transport control, volume and lowpass filter
//! - Bulk operations over every loaded sound
//!
//! Fetching, decoding and real-time scheduling are delegated to the host
//! through the `bridge-traits` capabilities held by [`AudioFx`].
//!
//! ## Usage
//!
//! ```ignore
//! use core_playback::{AudioFx, SoundOptions};
//! use core_runtime::config::AudioFxConfig;
//!
//! let fx = AudioFx::new(AudioFxConfig::builder().build()?);
//! let music = fx
//!     .load("https://cdn.example.com/theme.ogg", SoundOptions::default().with_loop(true))
//!     .await?;
//! music.change_filter(0.5, 0.1)?.play()?;
//! fx.change_volume_all(0.3);
//! ```

pub mod cache;
pub mod config;
pub mod curves;
pub mod error;
pub mod fx;
pub mod sound;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use cache::{BufferCache, LoadFuture};
pub use config::SoundOptions;
pub use error::{PlaybackError, Result};
pub use fx::AudioFx;
pub use sound::{Sound, SoundCallback, SoundId, SoundState};
