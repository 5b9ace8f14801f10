//! Audio engine bridge traits and the decoded buffer type.
//!
//! The core never touches samples in real time. It asks the host engine to
//! decode encoded bytes, to provision an output channel (source → lowpass
//! filter → gain → destination), and to schedule one-shot playbacks of a
//! shared buffer on that channel. Everything time-critical stays in the host.

use crate::{
    error::{BridgeError, Result},
    platform::{EndedHandler, PlatformSend, PlatformSendSync},
};
use bytes::Bytes;
use std::sync::Arc;

/// Immutable PCM data produced by [`AudioBackend::decode`].
///
/// Samples are stored planar (one `Vec<f32>` per channel) and normalized to
/// `[-1.0, 1.0]`. Buffers are shared behind `Arc` by every sound that plays
/// the same resource and are never mutated after decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl DecodedBuffer {
    /// Build a buffer from planar channel data.
    ///
    /// # Errors
    ///
    /// Fails when there are no channels, the sample rate is zero, or the
    /// channels differ in length.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if channels.is_empty() {
            return Err(BridgeError::OperationFailed(
                "decoded buffer has no channels".to_string(),
            ));
        }
        if sample_rate == 0 {
            return Err(BridgeError::OperationFailed(
                "decoded buffer has a zero sample rate".to_string(),
            ));
        }
        let frames = channels[0].len();
        if channels.iter().any(|c| c.len() != frames) {
            return Err(BridgeError::OperationFailed(
                "decoded buffer channels differ in length".to_string(),
            ));
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Silent buffer of the given shape, mostly useful for tests and fakes.
    pub fn silence(channel_count: usize, frames: usize, sample_rate: u32) -> Result<Self> {
        Self::new(vec![vec![0.0; frames]; channel_count.max(1)], sample_rate)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frame_count(&self) -> usize {
        self.channels[0].len()
    }

    /// Samples for one channel, if it exists.
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Length of the buffer in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }
}

/// Response curve of a [`FilterControl`]. Only lowpass is used today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterType {
    #[default]
    Lowpass,
    Highpass,
    Bandpass,
}

/// Host-provided gain stage.
pub trait GainControl: PlatformSendSync {
    /// Set the linear gain multiplier.
    fn set(&self, value: f32);

    /// Current linear gain multiplier.
    fn value(&self) -> f32;
}

/// Host-provided biquad filter stage.
pub trait FilterControl: PlatformSendSync {
    fn set_type(&self, filter_type: FilterType);

    /// Set the cutoff frequency in hertz.
    fn set_frequency(&self, hz: f32);

    /// Set the quality factor.
    fn set_q(&self, q: f32);

    fn filter_type(&self) -> FilterType;

    fn frequency(&self) -> f32;

    fn q(&self) -> f32;
}

/// Parameters for a single scheduled playback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleRequest {
    /// Seconds into the buffer at which playback begins.
    pub offset: f64,
    /// Restart from the beginning when the end of the buffer is reached.
    pub looping: bool,
}

impl ScheduleRequest {
    pub fn new(offset: f64, looping: bool) -> Self {
        Self { offset, looping }
    }
}

/// One-shot playback of a buffer. It cannot be restarted once stopped; a new
/// handle is scheduled for every play.
pub trait PlaybackHandle: PlatformSend {
    /// Stop at the given engine time. A time in the past stops immediately.
    fn stop(&mut self, when: f64) -> Result<()>;
}

/// A per-sound processing chain ending at the engine destination.
pub trait OutputChannel: PlatformSendSync {
    fn gain(&self) -> &dyn GainControl;

    fn filter(&self) -> &dyn FilterControl;

    /// Start playing `buffer` through this channel.
    ///
    /// `on_ended` fires once when the playback stops, naturally or through
    /// [`PlaybackHandle::stop`]. Implementations must deliver it
    /// asynchronously, never from inside this call or from inside `stop`.
    fn schedule_playback(
        &self,
        buffer: Arc<DecodedBuffer>,
        request: ScheduleRequest,
        on_ended: EndedHandler,
    ) -> Result<Box<dyn PlaybackHandle>>;
}

/// Host audio engine.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::audio::{AudioBackend, ScheduleRequest};
/// use std::sync::Arc;
///
/// async fn blip(backend: &dyn AudioBackend, bytes: bytes::Bytes) -> bridge_traits::Result<()> {
///     let buffer = Arc::new(backend.decode(bytes).await?);
///     let output = backend.create_output()?;
///     output.gain().set(0.5);
///     let _handle = output.schedule_playback(buffer, ScheduleRequest::new(0.0, false), Box::new(|| {}))?;
///     Ok(())
/// }
/// ```
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait AudioBackend: PlatformSendSync {
    /// Decode a complete encoded resource into PCM.
    async fn decode(&self, data: Bytes) -> Result<DecodedBuffer>;

    /// Provision a new filter → gain chain connected to the destination.
    fn create_output(&self) -> Result<Box<dyn OutputChannel>>;

    /// Monotonic engine clock in seconds.
    fn current_time(&self) -> f64;

    /// Output sample rate in hertz.
    fn sample_rate(&self) -> f32;

    /// Highest frequency a filter can represent (the Nyquist frequency).
    fn max_frequency(&self) -> f32 {
        self.sample_rate() / 2.0
    }
}
