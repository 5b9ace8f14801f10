//! Fake host capabilities shared by the integration tests.
//!
//! The fake engine records every parameter change and scheduled playback,
//! exposes a settable clock, and fires end notifications only when a test
//! asks for it.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    AudioBackend, DecodedBuffer, EndedHandler, FilterControl, FilterType, GainControl,
    HttpClient, HttpRequest, HttpResponse, OutputChannel, PlaybackHandle, ScheduleRequest,
};
use bytes::Bytes;
use core_playback::AudioFx;
use core_runtime::config::AudioFxConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Sample rate of the fake engine. Nyquist is 24 kHz.
pub const SAMPLE_RATE: f32 = 48_000.0;

/// Each encoded byte decodes to 10 ms of audio.
pub const SECONDS_PER_BYTE: f64 = 0.01;

pub struct PlaybackRecord {
    pub request: ScheduleRequest,
    pub buffer: Arc<DecodedBuffer>,
    pub stopped_at: Arc<Mutex<Option<f64>>>,
    on_ended: Option<EndedHandler>,
}

#[derive(Default)]
pub struct OutputState {
    gain: Mutex<f32>,
    filter: Mutex<(FilterType, f32, f32)>,
    playbacks: Mutex<Vec<PlaybackRecord>>,
}

impl OutputState {
    pub fn gain(&self) -> f32 {
        *self.gain.lock()
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter.lock().0
    }

    pub fn frequency(&self) -> f32 {
        self.filter.lock().1
    }

    pub fn q(&self) -> f32 {
        self.filter.lock().2
    }

    pub fn playback_count(&self) -> usize {
        self.playbacks.lock().len()
    }

    pub fn request(&self, index: usize) -> ScheduleRequest {
        self.playbacks.lock()[index].request
    }

    pub fn buffer(&self, index: usize) -> Arc<DecodedBuffer> {
        Arc::clone(&self.playbacks.lock()[index].buffer)
    }

    /// Engine time the playback was stopped at, if it was stopped.
    pub fn stopped_at(&self, index: usize) -> Option<f64> {
        *self.playbacks.lock()[index].stopped_at.lock()
    }

    /// Deliver the end notification of a playback, as the host would.
    pub fn finish(&self, index: usize) {
        let handler = self.playbacks.lock()[index]
            .on_ended
            .take()
            .expect("end notification already delivered");
        handler();
    }
}

struct FakeGain(Arc<OutputState>);

impl GainControl for FakeGain {
    fn set(&self, value: f32) {
        *self.0.gain.lock() = value;
    }

    fn value(&self) -> f32 {
        self.0.gain()
    }
}

struct FakeFilter(Arc<OutputState>);

impl FilterControl for FakeFilter {
    fn set_type(&self, filter_type: FilterType) {
        self.0.filter.lock().0 = filter_type;
    }

    fn set_frequency(&self, hz: f32) {
        self.0.filter.lock().1 = hz;
    }

    fn set_q(&self, q: f32) {
        self.0.filter.lock().2 = q;
    }

    fn filter_type(&self) -> FilterType {
        self.0.filter_type()
    }

    fn frequency(&self) -> f32 {
        self.0.frequency()
    }

    fn q(&self) -> f32 {
        self.0.q()
    }
}

struct FakeOutput {
    state: Arc<OutputState>,
    gain: FakeGain,
    filter: FakeFilter,
}

impl OutputChannel for FakeOutput {
    fn gain(&self) -> &dyn GainControl {
        &self.gain
    }

    fn filter(&self) -> &dyn FilterControl {
        &self.filter
    }

    fn schedule_playback(
        &self,
        buffer: Arc<DecodedBuffer>,
        request: ScheduleRequest,
        on_ended: EndedHandler,
    ) -> Result<Box<dyn PlaybackHandle>> {
        let stopped_at = Arc::new(Mutex::new(None));
        self.state.playbacks.lock().push(PlaybackRecord {
            request,
            buffer,
            stopped_at: Arc::clone(&stopped_at),
            on_ended: Some(on_ended),
        });
        Ok(Box::new(FakeHandle { stopped_at }))
    }
}

struct FakeHandle {
    stopped_at: Arc<Mutex<Option<f64>>>,
}

impl PlaybackHandle for FakeHandle {
    fn stop(&mut self, when: f64) -> Result<()> {
        *self.stopped_at.lock() = Some(when);
        Ok(())
    }
}

/// Recording audio engine with a manual clock.
#[derive(Default)]
pub struct FakeBackend {
    clock: Mutex<f64>,
    outputs: Mutex<Vec<Arc<OutputState>>>,
    decodes: AtomicUsize,
    refuse_outputs: AtomicBool,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_time(&self, seconds: f64) {
        *self.clock.lock() = seconds;
    }

    pub fn output(&self, index: usize) -> Arc<OutputState> {
        Arc::clone(&self.outputs.lock()[index])
    }

    pub fn decode_count(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }

    pub fn refuse_outputs(&self) {
        self.refuse_outputs.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl AudioBackend for FakeBackend {
    async fn decode(&self, data: Bytes) -> Result<DecodedBuffer> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        if data.starts_with(b"bad") {
            return Err(BridgeError::OperationFailed("unsupported codec".to_string()));
        }
        let frames = (data.len() as f64 * SECONDS_PER_BYTE * 44_100.0).round() as usize;
        DecodedBuffer::silence(2, frames, 44_100)
    }

    fn create_output(&self) -> Result<Box<dyn OutputChannel>> {
        if self.refuse_outputs.load(Ordering::SeqCst) {
            return Err(BridgeError::NotAvailable("no audio device".to_string()));
        }
        let state = Arc::new(OutputState::default());
        self.outputs.lock().push(Arc::clone(&state));
        Ok(Box::new(FakeOutput {
            gain: FakeGain(Arc::clone(&state)),
            filter: FakeFilter(Arc::clone(&state)),
            state,
        }))
    }

    fn current_time(&self) -> f64 {
        *self.clock.lock()
    }

    fn sample_rate(&self) -> f32 {
        SAMPLE_RATE
    }
}

/// In-memory HTTP server that counts fetches. Every request yields once
/// before answering, so concurrent loads really overlap.
#[derive(Default)]
pub struct FakeHttp {
    bodies: Mutex<HashMap<String, Bytes>>,
    fetches: AtomicUsize,
}

impl FakeHttp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Serve `seconds` of audio at `url`.
    pub fn serve(&self, url: &str, seconds: f64) {
        let len = (seconds / SECONDS_PER_BYTE).round() as usize;
        self.bodies
            .lock()
            .insert(url.to_string(), Bytes::from(vec![0u8; len]));
    }

    pub fn serve_bytes(&self, url: &str, body: &'static [u8]) {
        self.bodies
            .lock()
            .insert(url.to_string(), Bytes::from_static(body));
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        let body = self.bodies.lock().get(&request.url).cloned();
        Ok(match body {
            Some(body) => HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body,
            },
            None => HttpResponse {
                status: 404,
                headers: HashMap::new(),
                body: Bytes::new(),
            },
        })
    }
}

pub fn fixture() -> (AudioFx, Arc<FakeBackend>, Arc<FakeHttp>) {
    let backend = FakeBackend::new();
    let http = FakeHttp::new();
    let config = AudioFxConfig::new(backend.clone(), http.clone());
    (AudioFx::new(config), backend, http)
}

/// Callback that counts its invocations.
pub fn counting_callback() -> (Arc<AtomicUsize>, core_playback::SoundCallback) {
    let count = Arc::new(AtomicUsize::new(0));
    let inner = Arc::clone(&count);
    let callback: core_playback::SoundCallback = Arc::new(move |_: &core_playback::Sound| {
        inner.fetch_add(1, Ordering::SeqCst);
    });
    (count, callback)
}
