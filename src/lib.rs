//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-playback`, `core-runtime`). Host applications can
//! depend on `audiofx-workspace` and enable the documented features without
//! needing to wire each crate individually.

#[cfg(any(feature = "desktop-shims", feature = "wasm"))]
pub use core_playback::*;

#[cfg(any(feature = "desktop-shims", feature = "wasm"))]
pub use core_runtime::{config::AudioFxConfig, logging};
