#![cfg(not(target_arch = "wasm32"))]

mod common;

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    HttpClient, HttpRequest, HttpResponse,
};
use bytes::Bytes;
use common::{counting_callback, fixture, FakeBackend};
use core_playback::{AudioFx, PlaybackError, SoundOptions, SoundState};
use core_runtime::config::AudioFxConfig;
use mockall::{mock, Sequence};
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

mock! {
    HttpClient {}

    #[async_trait]
    impl HttpClient for HttpClient {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
    }
}

const URL: &str = "https://cdn.example.com/sfx/coin.wav";

fn response(status: u16, body: &'static [u8]) -> HttpResponse {
    HttpResponse {
        status,
        headers: HashMap::new(),
        body: Bytes::from_static(body),
    }
}

#[tokio::test]
async fn test_not_found_is_network_error_and_retry_succeeds() {
    let mut http = MockHttpClient::new();
    let mut seq = Sequence::new();
    http.expect_execute()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(response(404, b"")));
    http.expect_execute()
        .withf(|request| request.url == URL)
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(response(200, &[0u8; 100])));

    let backend = FakeBackend::new();
    let fx = AudioFx::new(AudioFxConfig::new(backend.clone(), Arc::new(http)));
    let (ready_calls, on_ready) = counting_callback();
    let sound = fx.create(URL, Some(on_ready), SoundOptions::default()).unwrap();

    let err = sound.load().await.unwrap_err();
    assert!(matches!(err, PlaybackError::NetworkError { .. }));
    assert!(err.is_load_error());
    assert_eq!(sound.state(), SoundState::Loading);
    assert!(!fx.cache().contains(URL));
    assert_eq!(fx.cache().pending_count(), 0);
    assert_eq!(ready_calls.load(Ordering::SeqCst), 0);

    sound.load().await.unwrap();
    assert_eq!(sound.state(), SoundState::Stopped);
    assert_eq!(ready_calls.load(Ordering::SeqCst), 1);
    assert!((sound.duration().unwrap() - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_transport_failure_is_network_error() {
    let mut http = MockHttpClient::new();
    http.expect_execute()
        .returning(|_| Err(BridgeError::OperationFailed("connection reset".to_string())));

    let fx = AudioFx::new(AudioFxConfig::new(FakeBackend::new(), Arc::new(http)));
    let err = fx.load(URL, SoundOptions::default()).await.unwrap_err();

    assert!(matches!(err, PlaybackError::NetworkError { .. }));
}

#[tokio::test]
async fn test_undecodable_body_is_decode_error() {
    let (fx, backend, http) = fixture();
    http.serve_bytes(URL, b"bad header");

    let sound = fx.create(URL, None, SoundOptions::default()).unwrap();
    let err = sound.load().await.unwrap_err();

    assert!(matches!(err, PlaybackError::DecodeError { .. }));
    assert_eq!(sound.state(), SoundState::Loading);
    assert_eq!(backend.decode_count(), 1);
    assert!(fx.cache().is_empty());
    assert_eq!(fx.cache().member_count(), 0);
}

#[tokio::test]
async fn test_failed_load_is_shared_by_concurrent_sounds() {
    let (fx, _, http) = fixture();

    let a = fx.create(URL, None, SoundOptions::default()).unwrap();
    let b = fx.create(URL, None, SoundOptions::default()).unwrap();
    let (ra, rb) = futures::join!(a.load(), b.load());

    assert!(matches!(ra, Err(PlaybackError::NetworkError { .. })));
    assert_eq!(ra, rb);
    assert_eq!(http.fetch_count(), 1);
}
