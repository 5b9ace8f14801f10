//! Headless audio engine.
//!
//! Decodes with Symphonia and tracks gain, filter and playback timing
//! without opening an output device. A playback "ends" when its remaining
//! buffer time has elapsed on the tokio timer, which is enough for servers,
//! CI and tests that drive the sound state machine.

use crate::decoder::SymphoniaDecoder;
use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    AudioBackend, DecodedBuffer, EndedHandler, FilterControl, FilterType, GainControl,
    OutputChannel, PlaybackHandle, ScheduleRequest,
};
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::Instant as TimerInstant;
use tracing::{debug, trace};

pub const DEFAULT_SAMPLE_RATE: f32 = 44_100.0;

/// Audio engine with a wall clock and no device.
pub struct HeadlessAudioBackend {
    epoch: Instant,
    sample_rate: f32,
    decoder: SymphoniaDecoder,
}

impl HeadlessAudioBackend {
    pub fn new() -> Self {
        Self::with_sample_rate(DEFAULT_SAMPLE_RATE)
    }

    pub fn with_sample_rate(sample_rate: f32) -> Self {
        Self {
            epoch: Instant::now(),
            sample_rate,
            decoder: SymphoniaDecoder::new(),
        }
    }
}

impl Default for HeadlessAudioBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioBackend for HeadlessAudioBackend {
    async fn decode(&self, data: Bytes) -> Result<DecodedBuffer> {
        self.decoder.decode(data).await
    }

    fn create_output(&self) -> Result<Box<dyn OutputChannel>> {
        Ok(Box::new(HeadlessOutput {
            epoch: self.epoch,
            gain: HeadlessGain::default(),
            filter: HeadlessFilter::new(self.sample_rate / 2.0),
        }))
    }

    fn current_time(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

struct HeadlessGain(AtomicU32);

impl Default for HeadlessGain {
    fn default() -> Self {
        Self(AtomicU32::new(1.0f32.to_bits()))
    }
}

impl GainControl for HeadlessGain {
    fn set(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    fn value(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy)]
struct FilterState {
    filter_type: FilterType,
    frequency: f32,
    q: f32,
}

struct HeadlessFilter(Mutex<FilterState>);

impl HeadlessFilter {
    fn new(frequency: f32) -> Self {
        Self(Mutex::new(FilterState {
            filter_type: FilterType::Lowpass,
            frequency,
            q: 1.0,
        }))
    }
}

impl FilterControl for HeadlessFilter {
    fn set_type(&self, filter_type: FilterType) {
        self.0.lock().filter_type = filter_type;
    }

    fn set_frequency(&self, hz: f32) {
        self.0.lock().frequency = hz;
    }

    fn set_q(&self, q: f32) {
        self.0.lock().q = q;
    }

    fn filter_type(&self) -> FilterType {
        self.0.lock().filter_type
    }

    fn frequency(&self) -> f32 {
        self.0.lock().frequency
    }

    fn q(&self) -> f32 {
        self.0.lock().q
    }
}

struct HeadlessOutput {
    epoch: Instant,
    gain: HeadlessGain,
    filter: HeadlessFilter,
}

impl OutputChannel for HeadlessOutput {
    fn gain(&self) -> &dyn GainControl {
        &self.gain
    }

    fn filter(&self) -> &dyn FilterControl {
        &self.filter
    }

    /// Requires a tokio runtime; the end timer runs as a spawned task.
    fn schedule_playback(
        &self,
        buffer: Arc<DecodedBuffer>,
        request: ScheduleRequest,
        on_ended: EndedHandler,
    ) -> Result<Box<dyn PlaybackHandle>> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| BridgeError::NotAvailable("tokio runtime".to_string()))?;

        let remaining = (buffer.duration_secs() - request.offset).max(0.0);
        let looping = request.looping;
        let natural_length = if looping {
            None
        } else {
            Some(Duration::try_from_secs_f64(remaining).map_err(|err| {
                BridgeError::OperationFailed(format!("Invalid buffer length {remaining}: {err}"))
            })?)
        };
        let (stop_tx, mut stop_rx) = mpsc::unbounded_channel::<Duration>();

        runtime.spawn(async move {
            let natural_end = async {
                match natural_length {
                    Some(length) => tokio::time::sleep(length).await,
                    None => std::future::pending::<()>().await,
                }
            };
            tokio::pin!(natural_end);

            // The earliest requested stop wins.
            let mut deadline: Option<TimerInstant> = None;
            loop {
                let pending_stop = deadline;
                let stop_timer = async move {
                    match pending_stop {
                        Some(at) => tokio::time::sleep_until(at).await,
                        None => std::future::pending::<()>().await,
                    }
                };

                tokio::select! {
                    _ = &mut natural_end => {
                        trace!("Headless playback reached the end");
                        break;
                    }
                    _ = stop_timer => break,
                    request = stop_rx.recv() => match request {
                        Some(delay) => {
                            let at = TimerInstant::now() + delay;
                            deadline = Some(deadline.map_or(at, |current| current.min(at)));
                        }
                        // A dropped handle stops the playback immediately.
                        None => break,
                    },
                }
            }
            on_ended();
        });

        debug!(offset = request.offset, remaining, looping, "Headless playback scheduled");
        Ok(Box::new(HeadlessPlayback {
            epoch: self.epoch,
            stop_tx,
        }))
    }
}

struct HeadlessPlayback {
    epoch: Instant,
    stop_tx: mpsc::UnboundedSender<Duration>,
}

impl PlaybackHandle for HeadlessPlayback {
    /// Stopping again with an earlier `when` moves the stop forward.
    fn stop(&mut self, when: f64) -> Result<()> {
        let now = self.epoch.elapsed().as_secs_f64();
        let delay = Duration::try_from_secs_f64((when - now).max(0.0)).map_err(|err| {
            BridgeError::OperationFailed(format!("Invalid stop time {when}: {err}"))
        })?;
        // The timer task is gone once the playback ended on its own.
        self.stop_tx.send(delay).ok();
        Ok(())
    }
}
