//! Browser tests for the JavaScript bindings.

#![cfg(target_arch = "wasm32")]

use core_playback::wasm::JsAudioFx;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

/// Fetches fine, but the body is not audio.
const NOT_AUDIO: &str = "data:audio/wav;base64,bm90IGF1ZGlvIGF0IGFsbA==";

#[wasm_bindgen_test]
async fn test_background_load_failure_rejects_loaded() {
    let fx = JsAudioFx::new().unwrap();
    let sound = fx.create(NOT_AUDIO, JsValue::UNDEFINED, None).unwrap();

    let err = JsFuture::from(sound.loaded()).await.unwrap_err();
    let err: js_sys::Error = err.dyn_into().unwrap();
    let message = String::from(err.message());
    assert!(message.contains("Failed to decode"), "{message}");
    assert_eq!(sound.state(), "loading");
}

#[wasm_bindgen_test]
async fn test_load_promise_rejects_on_failure() {
    let fx = JsAudioFx::new().unwrap();
    let promise = fx.load(NOT_AUDIO.to_string(), JsValue::UNDEFINED).unwrap();

    assert!(JsFuture::from(promise).await.is_err());
    assert_eq!(fx.cached_count(), 0);
}

#[wasm_bindgen_test]
fn test_invalid_options_throw() {
    let fx = JsAudioFx::new().unwrap();
    let options = js_sys::JSON::parse(r#"{"startVolume": 4}"#).unwrap();

    assert!(fx.create("sfx/laser.ogg", options, None).is_err());
}
