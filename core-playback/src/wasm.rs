//! WebAssembly bindings for core-playback
//!
//! Exposes `AudioFX` and `Sound` classes to JavaScript, wired to the browser
//! `AudioContext` and `fetch`.
//!
//! ```js
//! const fx = new AudioFX();
//! const laser = fx.create("sfx/laser.ogg", { loop: false, filterFrequency: 2000 }, (s) => s.play());
//! laser.loaded().catch((err) => console.error(err.message));
//! document.onclick = () => fx.resume();
//! ```

use crate::{AudioFx, PlaybackError, Sound, SoundCallback, SoundOptions};
use bridge_wasm::{WasmHttpClient, WebAudioBackend};
use core_runtime::config::AudioFxConfig;
use std::sync::Arc;
use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

/// Install the panic hook so Rust panics show up in DevTools.
#[cfg(feature = "wasm")]
#[wasm_bindgen(js_name = initPanicHook)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// Sound factory bound to one `AudioContext`.
#[wasm_bindgen(js_name = AudioFX)]
pub struct JsAudioFx {
    fx: AudioFx,
    backend: Arc<WebAudioBackend>,
}

#[wasm_bindgen(js_class = AudioFX)]
impl JsAudioFx {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<JsAudioFx, JsValue> {
        let backend = Arc::new(WebAudioBackend::new().map_err(bridge_error)?);
        let http = Arc::new(WasmHttpClient::new().map_err(bridge_error)?);
        let config = AudioFxConfig::new(backend.clone(), http);
        Ok(Self {
            fx: AudioFx::new(config),
            backend,
        })
    }

    /// Resume the context after a user gesture. Returns a `Promise`.
    pub fn resume(&self) -> js_sys::Promise {
        let backend = Arc::clone(&self.backend);
        future_to_promise(async move {
            backend.resume().await.map_err(bridge_error)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Create a sound and start loading it in the background. `onReady`
    /// receives the sound once its buffer is in place; load failures reject
    /// the sound's `loaded()` promise.
    pub fn create(
        &self,
        url: &str,
        options: JsValue,
        on_ready: Option<js_sys::Function>,
    ) -> Result<JsSound, JsValue> {
        let options = parse_options(&options)?;
        let sound = self
            .fx
            .create(url, on_ready.map(js_callback), options)
            .map_err(playback_error)?;

        // `future_to_promise` starts the load right away.
        let loaded = JsSound::load_promise(sound.clone());
        Ok(JsSound {
            sound,
            loaded: Some(loaded),
        })
    }

    /// Create a sound; the returned `Promise` resolves to it once ready.
    pub fn load(&self, url: String, options: JsValue) -> Result<js_sys::Promise, JsValue> {
        let options = parse_options(&options)?;
        let fx = self.fx.clone();
        Ok(future_to_promise(async move {
            let sound = fx.load(&url, options).await.map_err(playback_error)?;
            Ok(JsSound::new(sound).into())
        }))
    }

    #[wasm_bindgen(js_name = changeVolumeAll)]
    pub fn change_volume_all(&self, fraction: f32) {
        self.fx.change_volume_all(fraction);
    }

    #[wasm_bindgen(js_name = destroyAll)]
    pub fn destroy_all(&self) {
        self.fx.destroy_all();
    }

    #[wasm_bindgen(js_name = cachedCount)]
    pub fn cached_count(&self) -> usize {
        self.fx.cache().len()
    }
}

/// JavaScript handle to a [`Sound`].
#[wasm_bindgen(js_name = Sound)]
pub struct JsSound {
    sound: Sound,
    loaded: Option<js_sys::Promise>,
}

impl JsSound {
    fn new(sound: Sound) -> Self {
        Self {
            sound,
            loaded: None,
        }
    }

    fn load_promise(sound: Sound) -> js_sys::Promise {
        future_to_promise(async move {
            sound.load().await.map_err(playback_error)?;
            Ok(JsSound::new(sound).into())
        })
    }
}

#[wasm_bindgen(js_class = Sound)]
impl JsSound {
    /// `Promise` resolving to this sound once its buffer is ready, or
    /// rejecting with the load error.
    pub fn loaded(&self) -> js_sys::Promise {
        match &self.loaded {
            Some(promise) => promise.clone(),
            None => Self::load_promise(self.sound.clone()),
        }
    }

    pub fn url(&self) -> String {
        self.sound.url().to_string()
    }

    /// `"loading"`, `"stopped"`, `"playing"`, `"paused"` or `"destroyed"`.
    pub fn state(&self) -> String {
        self.sound.state().to_string()
    }

    #[wasm_bindgen(js_name = isPlaying)]
    pub fn is_playing(&self) -> bool {
        self.sound.is_playing()
    }

    pub fn play(&self) -> Result<(), JsValue> {
        self.sound.play().map(drop).map_err(playback_error)
    }

    #[wasm_bindgen(js_name = playFrom)]
    pub fn play_from(&self, offset: f64) -> Result<(), JsValue> {
        self.sound.play_from(offset).map(drop).map_err(playback_error)
    }

    pub fn pause(&self) -> Result<(), JsValue> {
        self.sound.pause().map(drop).map_err(playback_error)
    }

    pub fn stop(&self, when: Option<f64>) -> Result<(), JsValue> {
        self.sound
            .stop_at(when.unwrap_or(0.0))
            .map(drop)
            .map_err(playback_error)
    }

    pub fn toggle(&self) -> Result<(), JsValue> {
        self.sound.toggle().map(drop).map_err(playback_error)
    }

    #[wasm_bindgen(js_name = currentTime)]
    pub fn current_time(&self) -> f64 {
        self.sound.current_time()
    }

    pub fn duration(&self) -> Result<f64, JsValue> {
        self.sound.duration().map_err(playback_error)
    }

    #[wasm_bindgen(js_name = changeVolume)]
    pub fn change_volume(&self, fraction: f32) -> Result<(), JsValue> {
        self.sound.change_volume(fraction).map(drop).map_err(playback_error)
    }

    #[wasm_bindgen(js_name = changeFilter)]
    pub fn change_filter(&self, frequency: f64, quality: f64) -> Result<(), JsValue> {
        self.sound
            .change_filter(frequency, quality)
            .map(drop)
            .map_err(playback_error)
    }

    pub fn destroy(&self) -> Result<(), JsValue> {
        self.sound.destroy().map_err(playback_error)
    }
}

/// Options object to [`SoundOptions`]; `onEnded` is picked up as a callback.
fn parse_options(value: &JsValue) -> Result<SoundOptions, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(SoundOptions::default());
    }

    let mut options: SoundOptions = serde_wasm_bindgen::from_value(value.clone())
        .map_err(|err| playback_error(PlaybackError::InvalidArgument(err.to_string())))?;

    let on_ended = js_sys::Reflect::get(value, &JsValue::from_str("onEnded"))?;
    if let Ok(function) = on_ended.dyn_into::<js_sys::Function>() {
        options.on_ended = Some(js_callback(function));
    }
    Ok(options)
}

fn js_callback(function: js_sys::Function) -> SoundCallback {
    Arc::new(move |sound: &Sound| {
        let handle = JsValue::from(JsSound::new(sound.clone()));
        if let Err(err) = function.call1(&JsValue::NULL, &handle) {
            warn!(error = ?err, "Sound callback threw");
        }
    })
}

fn playback_error(err: PlaybackError) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

fn bridge_error(err: bridge_traits::BridgeError) -> JsValue {
    playback_error(err.into())
}
