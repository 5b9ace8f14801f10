//! Web Audio implementation of the `AudioBackend` bridge trait.
//!
//! Every output channel is a `BiquadFilterNode` feeding a `GainNode` that is
//! connected to the context destination. Each playback creates a fresh
//! `AudioBufferSourceNode` connected to the filter, since source nodes can
//! only be started once.

use crate::error::WasmError;
use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result as BridgeResult},
    AudioBackend, DecodedBuffer, EndedHandler, FilterControl, FilterType, GainControl,
    OutputChannel, PlaybackHandle, ScheduleRequest,
};
use bytes::Bytes;
use js_sys::Uint8Array;
use std::cell::RefCell;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AudioBuffer, AudioBufferSourceNode, AudioContext, AudioContextState, BiquadFilterNode,
    BiquadFilterType, GainNode,
};

/// Audio engine backed by a browser `AudioContext`.
pub struct WebAudioBackend {
    context: AudioContext,
}

impl WebAudioBackend {
    /// Create a backend with a new `AudioContext`.
    pub fn new() -> BridgeResult<Self> {
        let context = AudioContext::new()
            .map_err(|err| WasmError::NotAvailable(format!("AudioContext: {:?}", err)))?;
        Ok(Self { context })
    }

    /// Use an existing context, for pages that already own one.
    pub fn with_context(context: AudioContext) -> Self {
        Self { context }
    }

    /// The underlying context.
    pub fn context(&self) -> &AudioContext {
        &self.context
    }

    /// Resume a context suspended by the browser autoplay policy. Call from
    /// a user gesture handler.
    pub async fn resume(&self) -> BridgeResult<()> {
        if self.context.state() != AudioContextState::Suspended {
            return Ok(());
        }
        let promise = self.context.resume().map_err(|err| js("resume", err))?;
        JsFuture::from(promise).await.map_err(|err| js("resume", err))?;
        debug!("AudioContext resumed");
        Ok(())
    }
}

#[async_trait(?Send)]
impl AudioBackend for WebAudioBackend {
    async fn decode(&self, data: Bytes) -> BridgeResult<DecodedBuffer> {
        let array = Uint8Array::from(data.as_ref());
        let promise = self
            .context
            .decode_audio_data(&array.buffer())
            .map_err(|err| js("decodeAudioData", err))?;
        let decoded = JsFuture::from(promise)
            .await
            .map_err(|err| js("decodeAudioData", err))?;
        let audio_buffer: AudioBuffer = decoded.dyn_into().map_err(|value: JsValue| {
            BridgeError::from(WasmError::UnexpectedValue(format!("{:?}", value)))
        })?;

        let channels = (0..audio_buffer.number_of_channels())
            .map(|index| {
                audio_buffer
                    .get_channel_data(index)
                    .map_err(|err| js("getChannelData", err))
            })
            .collect::<BridgeResult<Vec<Vec<f32>>>>()?;

        DecodedBuffer::new(channels, audio_buffer.sample_rate() as u32)
    }

    fn create_output(&self) -> BridgeResult<Box<dyn OutputChannel>> {
        let filter = self
            .context
            .create_biquad_filter()
            .map_err(|err| js("createBiquadFilter", err))?;
        let gain = self
            .context
            .create_gain()
            .map_err(|err| js("createGain", err))?;

        filter
            .connect_with_audio_node(&gain)
            .map_err(|err| js("connect filter", err))?;
        gain.connect_with_audio_node(&self.context.destination())
            .map_err(|err| js("connect gain", err))?;

        Ok(Box::new(WebAudioOutput {
            context: self.context.clone(),
            filter: WebFilter(filter),
            gain: WebGain(gain),
            uploaded: RefCell::new(None),
        }))
    }

    fn current_time(&self) -> f64 {
        self.context.current_time()
    }

    fn sample_rate(&self) -> f32 {
        self.context.sample_rate()
    }
}

struct WebGain(GainNode);

impl GainControl for WebGain {
    fn set(&self, value: f32) {
        self.0.gain().set_value(value);
    }

    fn value(&self) -> f32 {
        self.0.gain().value()
    }
}

struct WebFilter(BiquadFilterNode);

impl FilterControl for WebFilter {
    fn set_type(&self, filter_type: FilterType) {
        self.0.set_type(match filter_type {
            FilterType::Lowpass => BiquadFilterType::Lowpass,
            FilterType::Highpass => BiquadFilterType::Highpass,
            FilterType::Bandpass => BiquadFilterType::Bandpass,
        });
    }

    fn set_frequency(&self, hz: f32) {
        self.0.frequency().set_value(hz);
    }

    fn set_q(&self, q: f32) {
        self.0.q().set_value(q);
    }

    fn filter_type(&self) -> FilterType {
        match self.0.type_() {
            BiquadFilterType::Highpass => FilterType::Highpass,
            BiquadFilterType::Bandpass => FilterType::Bandpass,
            _ => FilterType::Lowpass,
        }
    }

    fn frequency(&self) -> f32 {
        self.0.frequency().value()
    }

    fn q(&self) -> f32 {
        self.0.q().value()
    }
}

struct WebAudioOutput {
    context: AudioContext,
    filter: WebFilter,
    gain: WebGain,
    /// Last buffer copied into the context. A sound replays one buffer, so a
    /// single slot avoids a copy per play.
    uploaded: RefCell<Option<(Weak<DecodedBuffer>, AudioBuffer)>>,
}

impl WebAudioOutput {
    fn upload(&self, buffer: &Arc<DecodedBuffer>) -> BridgeResult<AudioBuffer> {
        if let Some((source, uploaded)) = &*self.uploaded.borrow() {
            if source.upgrade().is_some_and(|s| Arc::ptr_eq(&s, buffer)) {
                return Ok(uploaded.clone());
            }
        }

        let audio_buffer = self
            .context
            .create_buffer(
                buffer.channel_count() as u32,
                buffer.frame_count().max(1) as u32,
                buffer.sample_rate() as f32,
            )
            .map_err(|err| js("createBuffer", err))?;
        for index in 0..buffer.channel_count() {
            if let Some(samples) = buffer.channel(index) {
                audio_buffer
                    .copy_to_channel(samples, index as i32)
                    .map_err(|err| js("copyToChannel", err))?;
            }
        }

        *self.uploaded.borrow_mut() = Some((Arc::downgrade(buffer), audio_buffer.clone()));
        Ok(audio_buffer)
    }
}

impl OutputChannel for WebAudioOutput {
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
    ) -> BridgeResult<Box<dyn PlaybackHandle>> {
        let audio_buffer = self.upload(&buffer)?;
        let source = self
            .context
            .create_buffer_source()
            .map_err(|err| js("createBufferSource", err))?;
        source.set_buffer(Some(&audio_buffer));
        source.set_loop(request.looping);
        source
            .connect_with_audio_node(&self.filter.0)
            .map_err(|err| js("connect source", err))?;

        // Frees itself after the single `ended` event.
        let ended = Closure::once_into_js(move || on_ended());
        source.set_onended(Some(ended.unchecked_ref()));

        source
            .start_with_when_and_grain_offset(0.0, request.offset)
            .map_err(|err| js("start", err))?;

        Ok(Box::new(WebPlayback {
            source,
            stopped: false,
        }))
    }
}

struct WebPlayback {
    source: AudioBufferSourceNode,
    stopped: bool,
}

impl PlaybackHandle for WebPlayback {
    /// The browser applies the most recent stop time, so a pending stop can
    /// be brought forward.
    fn stop(&mut self, when: f64) -> BridgeResult<()> {
        self.source
            .stop_with_when(when.max(0.0))
            .map_err(|err| js("stop", err))?;
        self.stopped = true;
        Ok(())
    }
}

impl Drop for WebPlayback {
    fn drop(&mut self) {
        if !self.stopped {
            // Stopping an already ended source is a no-op in the browser.
            if let Err(err) = self.source.stop() {
                warn!(error = ?err, "Failed to stop dropped playback");
            }
        }
    }
}

fn js(context: &str, err: JsValue) -> BridgeError {
    WasmError::js(context, err).into()
}
