//! # Sound
//!
//! A single playable sound bound to one URL: its own filter → gain output
//! channel, a shared decoded buffer once loaded, and a small transport state
//! machine.
//!
//! ```text
//!            load ok                play
//! Loading ──────────> Stopped ──────────────> Playing
//!    │                  ▲  ▲                   │  │
//!    │                  │  └──── stop / end ───┘  │ pause
//!    │                  │                         ▼
//!    │                  └──────── stop ──────── Paused
//!    │                                            │ play (resume)
//!    └──── destroy (from any state) ──> Destroyed ◄┘
//! ```
//!
//! Every `play` schedules a fresh [`PlaybackHandle`] tagged with a generation
//! number. End notifications carrying an older generation are ignored, so a
//! stop followed by a quick restart never resets the new playback.

use crate::cache::{BufferCache, LoadFuture};
use crate::config::SoundOptions;
use crate::curves::{filter_params, volume_to_gain};
use crate::error::{PlaybackError, Result};
use bridge_traits::{
    AudioBackend, DecodedBuffer, EndedHandler, FilterType, HttpClient, OutputChannel,
    PlaybackHandle, ScheduleRequest,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, instrument, trace, warn};

/// Callback receiving the sound it was registered on.
#[cfg(not(target_arch = "wasm32"))]
pub type SoundCallback = Arc<dyn Fn(&Sound) + Send + Sync>;

#[cfg(target_arch = "wasm32")]
pub type SoundCallback = Arc<dyn Fn(&Sound)>;

static NEXT_SOUND_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique sound identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoundId(u64);

impl SoundId {
    fn next() -> Self {
        Self(NEXT_SOUND_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sound-{}", self.0)
    }
}

/// Observable lifecycle state of a [`Sound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundState {
    /// The buffer is being fetched or decoded.
    Loading,
    /// Ready, not playing. Playback starts from the beginning.
    Stopped,
    Playing,
    /// Ready, not playing. Playback resumes from the saved position.
    Paused,
    /// Terminal; every operation is rejected.
    Destroyed,
}

impl fmt::Display for SoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SoundState::Loading => "loading",
            SoundState::Stopped => "stopped",
            SoundState::Playing => "playing",
            SoundState::Paused => "paused",
            SoundState::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

struct ActivePlayback {
    handle: Box<dyn PlaybackHandle>,
    generation: u64,
    /// Engine time at which the handle was scheduled.
    started_at: f64,
    /// Buffer position the handle started from.
    offset: f64,
}

enum Transport {
    Stopped,
    Playing(ActivePlayback),
    Paused { offset: f64 },
}

struct Ready {
    buffer: Arc<DecodedBuffer>,
    transport: Transport,
    /// Playback told to stop at a future engine time; cut off by the next start.
    fading: Option<Box<dyn PlaybackHandle>>,
}

enum Phase {
    Loading,
    Ready(Ready),
    Destroyed,
}

impl Phase {
    fn ready_mut(&mut self) -> Result<&mut Ready> {
        match self {
            Phase::Ready(ready) => Ok(ready),
            Phase::Loading => Err(PlaybackError::NotReady),
            Phase::Destroyed => Err(PlaybackError::Destroyed),
        }
    }

    fn state(&self) -> SoundState {
        match self {
            Phase::Loading => SoundState::Loading,
            Phase::Destroyed => SoundState::Destroyed,
            Phase::Ready(ready) => match ready.transport {
                Transport::Stopped => SoundState::Stopped,
                Transport::Playing(_) => SoundState::Playing,
                Transport::Paused { .. } => SoundState::Paused,
            },
        }
    }
}

pub(crate) struct SoundInner {
    id: SoundId,
    url: String,
    looping: bool,
    autoplay: bool,
    on_ready: Option<SoundCallback>,
    on_ended: Option<SoundCallback>,
    backend: Arc<dyn AudioBackend>,
    http: Arc<dyn HttpClient>,
    cache: Arc<BufferCache>,
    output: Box<dyn OutputChannel>,
    phase: Mutex<Phase>,
    next_generation: AtomicU64,
}

/// Handle to a sound. Clones refer to the same sound.
#[derive(Clone)]
pub struct Sound {
    inner: Arc<SoundInner>,
}

/// Non-owning reference kept in the cache membership list.
#[derive(Clone)]
pub(crate) struct WeakSound {
    id: SoundId,
    inner: Weak<SoundInner>,
}

impl WeakSound {
    pub(crate) fn id(&self) -> SoundId {
        self.id
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    pub(crate) fn upgrade(&self) -> Option<Sound> {
        self.inner.upgrade().map(|inner| Sound { inner })
    }
}

impl Sound {
    /// Create a sound in the `Loading` state and set up its output channel.
    ///
    /// Nothing is fetched until [`Sound::load`] is awaited.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::InvalidArgument`] for an empty URL or invalid options
    /// - [`PlaybackError::PlatformUnavailable`] if the backend cannot
    ///   provision an output channel
    pub(crate) fn new(
        url: &str,
        on_ready: Option<SoundCallback>,
        options: SoundOptions,
        backend: Arc<dyn AudioBackend>,
        http: Arc<dyn HttpClient>,
        cache: Arc<BufferCache>,
    ) -> Result<Self> {
        if url.trim().is_empty() {
            return Err(PlaybackError::InvalidArgument(
                "url must be a non-empty string".to_string(),
            ));
        }
        options.validate()?;

        let output = backend
            .create_output()
            .map_err(|err| PlaybackError::PlatformUnavailable(err.to_string()))?;

        output.filter().set_type(FilterType::Lowpass);
        output.filter().set_frequency(
            options
                .filter_frequency
                .unwrap_or_else(|| backend.max_frequency()),
        );
        output.gain().set(volume_to_gain(options.start_volume));

        let id = SoundId::next();
        debug!(sound_id = %id, url, looping = options.looping, "Sound created");

        Ok(Self {
            inner: Arc::new(SoundInner {
                id,
                url: url.to_string(),
                looping: options.looping,
                autoplay: options.autoplay,
                on_ready,
                on_ended: options.on_ended,
                backend,
                http,
                cache,
                output,
                phase: Mutex::new(Phase::Loading),
                next_generation: AtomicU64::new(1),
            }),
        })
    }

    pub fn id(&self) -> SoundId {
        self.inner.id
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn is_looping(&self) -> bool {
        self.inner.looping
    }

    pub fn state(&self) -> SoundState {
        self.inner.phase.lock().state()
    }

    pub fn is_playing(&self) -> bool {
        self.state() == SoundState::Playing
    }

    /// The shared buffer, once loaded.
    pub fn buffer(&self) -> Option<Arc<DecodedBuffer>> {
        match &*self.inner.phase.lock() {
            Phase::Ready(ready) => Some(Arc::clone(&ready.buffer)),
            _ => None,
        }
    }

    /// Current linear gain of the output channel.
    pub fn gain(&self) -> f32 {
        self.inner.output.gain().value()
    }

    /// Current filter cutoff in hertz.
    pub fn filter_frequency(&self) -> f32 {
        self.inner.output.filter().frequency()
    }

    pub fn filter_q(&self) -> f32 {
        self.inner.output.filter().q()
    }

    pub(crate) fn downgrade(&self) -> WeakSound {
        WeakSound {
            id: self.inner.id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Fetch and decode the buffer, or reuse the cached one.
    ///
    /// On success the sound becomes `Stopped` and joins the cache membership,
    /// then starts playing if `autoplay` was set, and finally invokes the
    /// ready callback. Calling `load` on a sound that is already ready
    /// returns immediately.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::NetworkError`] / [`PlaybackError::DecodeError`] if
    ///   the resource cannot be loaded; the sound stays `Loading`
    /// - [`PlaybackError::Destroyed`] if the sound was destroyed before or
    ///   during the load. A buffer that finished loading is still cached.
    #[instrument(skip(self), fields(sound_id = %self.inner.id, url = %self.inner.url))]
    pub async fn load(&self) -> Result<()> {
        match self.state() {
            SoundState::Loading => {}
            SoundState::Destroyed => return Err(PlaybackError::Destroyed),
            _ => return Ok(()),
        }

        let url = self.inner.url.clone();
        let http = Arc::clone(&self.inner.http);
        let backend = Arc::clone(&self.inner.backend);
        let loaded = self
            .inner
            .cache
            .get_or_load(&self.inner.url, move || -> LoadFuture {
                Box::pin(fetch_and_decode(http, backend, url))
            })
            .await;

        match loaded {
            Ok(buffer) => self.adopt(buffer),
            Err(err) => {
                error!(error = %err, "Failed to load sound");
                Err(err)
            }
        }
    }

    fn adopt(&self, buffer: Arc<DecodedBuffer>) -> Result<()> {
        let duration = buffer.duration_secs();
        {
            let mut phase = self.inner.phase.lock();
            match *phase {
                Phase::Loading => {
                    *phase = Phase::Ready(Ready {
                        buffer,
                        transport: Transport::Stopped,
                        fading: None,
                    });
                }
                Phase::Destroyed => {
                    debug!("Sound destroyed while loading");
                    return Err(PlaybackError::Destroyed);
                }
                // Another load() on this handle finished first.
                Phase::Ready(_) => return Ok(()),
            }
        }

        self.inner.cache.register(self);
        info!(duration_secs = duration, "Sound ready");

        if self.inner.autoplay {
            self.play()?;
        }
        if let Some(on_ready) = &self.inner.on_ready {
            on_ready(self);
        }
        Ok(())
    }

    /// Start playback.
    ///
    /// From `Stopped` this plays from the beginning, from `Paused` it resumes
    /// at the saved position, and from `Playing` it stops the current
    /// playback and restarts from the beginning.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::NotReady`] while loading, [`PlaybackError::Destroyed`]
    /// after destroy, [`PlaybackError::PlaybackFailed`] if the engine rejects
    /// the request.
    pub fn play(&self) -> Result<&Self> {
        self.start(None)
    }

    /// Start playback at `offset` seconds into the buffer, replacing any
    /// current playback or saved pause position.
    pub fn play_from(&self, offset: f64) -> Result<&Self> {
        if !offset.is_finite() || offset < 0.0 {
            return Err(PlaybackError::InvalidArgument(format!(
                "offset must be a non-negative number of seconds, got {}",
                offset
            )));
        }
        self.start(Some(offset))
    }

    fn start(&self, requested: Option<f64>) -> Result<&Self> {
        let mut phase = self.inner.phase.lock();
        let ready = phase.ready_mut()?;

        let resume_at = match std::mem::replace(&mut ready.transport, Transport::Stopped) {
            Transport::Stopped => 0.0,
            Transport::Paused { offset } => offset,
            Transport::Playing(mut active) => {
                trace!(sound_id = %self.inner.id, "Restarting playback");
                active.handle.stop(0.0)?;
                0.0
            }
        };
        if let Some(mut fading) = ready.fading.take() {
            fading.stop(0.0)?;
        }
        let offset = requested.unwrap_or(resume_at);

        let duration = ready.buffer.duration_secs();
        let scheduled_offset = if self.inner.looping && duration > 0.0 {
            offset % duration
        } else {
            offset
        };

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let started_at = self.inner.backend.current_time();
        let handle = self.inner.output.schedule_playback(
            Arc::clone(&ready.buffer),
            ScheduleRequest::new(scheduled_offset, self.inner.looping),
            self.ended_handler(generation),
        )?;

        ready.transport = Transport::Playing(ActivePlayback {
            handle,
            generation,
            started_at,
            offset,
        });
        debug!(sound_id = %self.inner.id, offset, generation, "Playback started");
        Ok(self)
    }

    fn ended_handler(&self, generation: u64) -> EndedHandler {
        let inner = Arc::downgrade(&self.inner);
        Box::new(move || {
            if let Some(inner) = inner.upgrade() {
                Sound { inner }.playback_ended(generation);
            }
        })
    }

    fn playback_ended(&self, generation: u64) {
        let finished = {
            let mut phase = self.inner.phase.lock();
            match &mut *phase {
                Phase::Ready(ready) => {
                    let current = matches!(
                        &ready.transport,
                        Transport::Playing(active) if active.generation == generation
                    );
                    if current && !self.inner.looping {
                        ready.transport = Transport::Stopped;
                        true
                    } else {
                        false
                    }
                }
                _ => false,
            }
        };

        if !finished {
            trace!(sound_id = %self.inner.id, generation, "Ignoring stale end notification");
            return;
        }

        debug!(sound_id = %self.inner.id, "Playback reached the end");
        if let Some(on_ended) = &self.inner.on_ended {
            on_ended(self);
        }
    }

    /// Pause playback and remember the position. A no-op unless playing.
    pub fn pause(&self) -> Result<&Self> {
        let mut phase = self.inner.phase.lock();
        let ready = phase.ready_mut()?;

        match std::mem::replace(&mut ready.transport, Transport::Stopped) {
            Transport::Playing(mut active) => {
                let elapsed = (self.inner.backend.current_time() - active.started_at).max(0.0);
                let offset = active.offset + elapsed;
                ready.transport = Transport::Paused { offset };
                debug!(sound_id = %self.inner.id, offset, "Playback paused");
                active.handle.stop(0.0)?;
            }
            other => ready.transport = other,
        }
        Ok(self)
    }

    /// Stop immediately and forget the pause position.
    pub fn stop(&self) -> Result<&Self> {
        self.stop_at(0.0)
    }

    /// Stop at engine time `when` and forget the pause position.
    ///
    /// The sound is `Stopped` as soon as this returns, even when the engine
    /// keeps playing until `when`. Such a fading-out playback is cut off by
    /// the next `play`, so at most one playback is audible per sound.
    pub fn stop_at(&self, when: f64) -> Result<&Self> {
        if !when.is_finite() || when < 0.0 {
            return Err(PlaybackError::InvalidArgument(format!(
                "stop time must be a non-negative engine time in seconds, got {}",
                when
            )));
        }
        let mut phase = self.inner.phase.lock();
        let ready = phase.ready_mut()?;

        if let Transport::Playing(mut active) =
            std::mem::replace(&mut ready.transport, Transport::Stopped)
        {
            debug!(sound_id = %self.inner.id, when, "Playback stopped");
            active.handle.stop(when)?;
            if when > self.inner.backend.current_time() {
                if let Some(mut previous) = ready.fading.replace(active.handle) {
                    previous.stop(0.0)?;
                }
            }
        }
        Ok(self)
    }

    /// Pause when playing, otherwise play.
    pub fn toggle(&self) -> Result<&Self> {
        if self.is_playing() {
            self.pause()
        } else {
            self.play()
        }
    }

    /// Playback position in seconds.
    ///
    /// While playing this is the start offset plus the engine time elapsed
    /// since the playback began; it is not wrapped for looping sounds. While
    /// paused it is the saved position, and zero otherwise.
    pub fn current_time(&self) -> f64 {
        match &*self.inner.phase.lock() {
            Phase::Ready(ready) => match &ready.transport {
                Transport::Playing(active) => {
                    let elapsed = self.inner.backend.current_time() - active.started_at;
                    active.offset + elapsed.max(0.0)
                }
                Transport::Paused { offset } => *offset,
                Transport::Stopped => 0.0,
            },
            _ => 0.0,
        }
    }

    /// Buffer length in seconds.
    pub fn duration(&self) -> Result<f64> {
        let mut phase = self.inner.phase.lock();
        Ok(phase.ready_mut()?.buffer.duration_secs())
    }

    /// Set the volume from a fraction in `[0, 1]`; out-of-range values are
    /// clamped. Allowed while loading.
    pub fn change_volume(&self, fraction: f32) -> Result<&Self> {
        self.ensure_alive()?;
        let gain = volume_to_gain(fraction);
        self.inner.output.gain().set(gain);
        trace!(sound_id = %self.inner.id, fraction, gain, "Volume changed");
        Ok(self)
    }

    /// Alias for [`Sound::change_volume`].
    pub fn volume(&self, fraction: f32) -> Result<&Self> {
        self.change_volume(fraction)
    }

    /// Set the lowpass cutoff and quality from fractions in `[0, 1]`.
    ///
    /// The cutoff sweeps logarithmically from 40 Hz to the Nyquist frequency
    /// of the engine. Allowed while loading.
    pub fn change_filter(&self, frequency: f64, quality: f64) -> Result<&Self> {
        self.ensure_alive()?;
        let nyquist = f64::from(self.inner.backend.sample_rate()) / 2.0;
        let (hz, q) = filter_params(frequency, quality, nyquist);
        let filter = self.inner.output.filter();
        filter.set_frequency(hz as f32);
        filter.set_q(q as f32);
        trace!(sound_id = %self.inner.id, hz, q, "Filter changed");
        Ok(self)
    }

    /// Alias for [`Sound::change_filter`].
    pub fn filter(&self, frequency: f64, quality: f64) -> Result<&Self> {
        self.change_filter(frequency, quality)
    }

    /// Stop playback, leave the cache membership and reject every later
    /// operation. Destroying twice is a no-op.
    ///
    /// The buffer stays cached for other sounds.
    pub fn destroy(&self) -> Result<()> {
        let previous = std::mem::replace(&mut *self.inner.phase.lock(), Phase::Destroyed);
        let mut handles = Vec::new();
        match previous {
            Phase::Destroyed => return Ok(()),
            Phase::Loading => {}
            Phase::Ready(ready) => {
                if let Transport::Playing(active) = ready.transport {
                    handles.push(active.handle);
                }
                handles.extend(ready.fading);
            }
        }

        self.inner.cache.remove(self.inner.id);
        info!(sound_id = %self.inner.id, url = %self.inner.url, "Sound destroyed");

        for mut handle in handles {
            handle.stop(0.0)?;
        }
        Ok(())
    }

    /// Alias for [`Sound::destroy`].
    pub fn kill(&self) -> Result<()> {
        self.destroy()
    }

    /// Alias for [`Sound::destroy`].
    pub fn remove(&self) -> Result<()> {
        self.destroy()
    }

    fn ensure_alive(&self) -> Result<()> {
        match *self.inner.phase.lock() {
            Phase::Destroyed => Err(PlaybackError::Destroyed),
            _ => Ok(()),
        }
    }
}

async fn fetch_and_decode(
    http: Arc<dyn HttpClient>,
    backend: Arc<dyn AudioBackend>,
    url: String,
) -> Result<Arc<DecodedBuffer>> {
    let bytes = http
        .fetch_bytes(&url)
        .await
        .map_err(|err| PlaybackError::network(&url, err))?;
    debug!(bytes = bytes.len(), "Fetched encoded audio");

    let buffer = backend
        .decode(bytes)
        .await
        .map_err(|err| PlaybackError::decode(&url, err))?;
    if buffer.frame_count() == 0 {
        warn!(url = %url, "Decoded buffer is empty");
    }
    Ok(Arc::new(buffer))
}

impl fmt::Debug for Sound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sound")
            .field("id", &self.inner.id)
            .field("url", &self.inner.url)
            .field("state", &self.state())
            .finish()
    }
}

impl PartialEq for Sound {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Sound {}
