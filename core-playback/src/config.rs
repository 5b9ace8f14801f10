//! # Sound Configuration
//!
//! Per-sound options. Deserializing a partial document keeps the defaults for
//! every key it leaves out, so `{"loop": true}` only turns looping on.

use crate::error::{PlaybackError, Result};
use crate::sound::SoundCallback;
use serde::{Deserialize, Serialize};

/// Options applied when a sound is created.
#[derive(Clone, Serialize, Deserialize)]
pub struct SoundOptions {
    /// Restart from the beginning when the buffer ends.
    ///
    /// Default: false.
    #[serde(rename = "loop", default)]
    pub looping: bool,

    /// Initial volume as a fraction between 0.0 and 1.0. Goes through the
    /// same curve as [`Sound::change_volume`](crate::Sound::change_volume).
    ///
    /// Default: 1.0.
    #[serde(default = "default_start_volume", alias = "startVolume")]
    pub start_volume: f32,

    /// Initial lowpass cutoff in hertz.
    ///
    /// Default: the backend's maximum frequency (filter fully open).
    #[serde(default, alias = "filterFrequency")]
    pub filter_frequency: Option<f32>,

    /// Start playing as soon as the buffer is ready.
    ///
    /// Default: false.
    #[serde(default)]
    pub autoplay: bool,

    /// Invoked when a non-looping playback reaches the end of the buffer.
    #[serde(skip)]
    pub on_ended: Option<SoundCallback>,
}

impl Default for SoundOptions {
    fn default() -> Self {
        Self {
            looping: false,
            start_volume: default_start_volume(),
            filter_frequency: None,
            autoplay: false,
            on_ended: None,
        }
    }
}

impl std::fmt::Debug for SoundOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundOptions")
            .field("looping", &self.looping)
            .field("start_volume", &self.start_volume)
            .field("filter_frequency", &self.filter_frequency)
            .field("autoplay", &self.autoplay)
            .field("on_ended", &self.on_ended.as_ref().map(|_| "Fn(&Sound)"))
            .finish()
    }
}

impl SoundOptions {
    pub fn with_loop(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_start_volume(mut self, volume: f32) -> Self {
        self.start_volume = volume;
        self
    }

    pub fn with_filter_frequency(mut self, hz: f32) -> Self {
        self.filter_frequency = Some(hz);
        self
    }

    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn with_on_ended(mut self, callback: SoundCallback) -> Self {
        self.on_ended = Some(callback);
        self
    }

    /// Validate option values.
    pub fn validate(&self) -> Result<()> {
        if !self.start_volume.is_finite() || !(0.0..=1.0).contains(&self.start_volume) {
            return Err(PlaybackError::InvalidArgument(format!(
                "start_volume must be between 0.0 and 1.0, got {}",
                self.start_volume
            )));
        }

        if let Some(hz) = self.filter_frequency {
            if !hz.is_finite() || hz <= 0.0 {
                return Err(PlaybackError::InvalidArgument(format!(
                    "filter_frequency must be a positive number of hertz, got {}",
                    hz
                )));
            }
        }

        Ok(())
    }
}

fn default_start_volume() -> f32 {
    1.0
}
