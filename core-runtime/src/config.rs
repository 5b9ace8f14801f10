//! # Core Configuration Module
//!
//! Collects the host capabilities AudioFX needs before any sound is created.
//!
//! ## Required Dependencies
//!
//! - `AudioBackend` - decoding, output channels and the engine clock
//! - `HttpClient` - fetching encoded resources
//!
//! When the `desktop-shims` feature is enabled, `bridge-desktop` defaults
//! (`HeadlessAudioBackend`, `ReqwestHttpClient`) are injected for anything
//! not provided explicitly.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::AudioFxConfig;
//! use std::sync::Arc;
//!
//! let config = AudioFxConfig::builder()
//!     .backend(Arc::new(MyBackend::new()))
//!     .http_client(Arc::new(MyHttpClient::new()))
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! Missing capabilities are reported as [`Error::CapabilityMissing`] with an
//! actionable message instead of failing later on first use.

use crate::error::{Error, Result};
use bridge_traits::{AudioBackend, HttpClient};
use std::sync::Arc;

/// Host capabilities shared by every sound of one AudioFX instance.
#[derive(Clone)]
pub struct AudioFxConfig {
    /// Host audio engine
    pub backend: Arc<dyn AudioBackend>,

    /// Transport used to fetch encoded audio
    pub http_client: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for AudioFxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioFxConfig")
            .field("backend", &"AudioBackend { ... }")
            .field("http_client", &"HttpClient { ... }")
            .finish()
    }
}

impl AudioFxConfig {
    /// Creates a new builder for constructing an `AudioFxConfig`.
    pub fn builder() -> AudioFxConfigBuilder {
        AudioFxConfigBuilder::default()
    }

    /// Configuration wired directly from the given capabilities.
    pub fn new(backend: Arc<dyn AudioBackend>, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            backend,
            http_client,
        }
    }
}

/// Builder for [`AudioFxConfig`].
#[derive(Default)]
pub struct AudioFxConfigBuilder {
    backend: Option<Arc<dyn AudioBackend>>,
    http_client: Option<Arc<dyn HttpClient>>,
}

impl AudioFxConfigBuilder {
    /// Sets the host audio engine.
    pub fn backend(mut self, backend: Arc<dyn AudioBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Sets the HTTP transport.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Validates the collected capabilities and builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityMissing`] when a capability was not
    /// provided and no platform default is available.
    pub fn build(self) -> Result<AudioFxConfig> {
        let backend = match self.backend {
            Some(backend) => backend,
            None => provide_default_backend()?,
        };
        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        Ok(AudioFxConfig {
            backend,
            http_client,
        })
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_backend() -> Result<Arc<dyn AudioBackend>> {
    Err(Error::CapabilityMissing {
        capability: "AudioBackend".to_string(),
        message: "An AudioBackend implementation is required for decoding and playback. \
                  Desktop: enable the 'desktop-shims' feature to use HeadlessAudioBackend. \
                  Web: inject bridge_wasm::WebAudioBackend."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_backend() -> Result<Arc<dyn AudioBackend>> {
    use bridge_desktop::HeadlessAudioBackend;

    let backend: Arc<dyn AudioBackend> = Arc::new(HeadlessAudioBackend::new());
    Ok(backend)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "An HttpClient implementation is required to fetch audio resources. \
                  Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                  Web: inject bridge_wasm::WasmHttpClient."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new()
        .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{
        error::Result as BridgeResult, DecodedBuffer, HttpRequest, HttpResponse, OutputChannel,
    };

    struct NullBackend;

    #[async_trait]
    impl AudioBackend for NullBackend {
        async fn decode(&self, _data: bytes::Bytes) -> BridgeResult<DecodedBuffer> {
            DecodedBuffer::silence(1, 1, 8000)
        }

        fn create_output(&self) -> BridgeResult<Box<dyn OutputChannel>> {
            Err(bridge_traits::BridgeError::NotAvailable("null".to_string()))
        }

        fn current_time(&self) -> f64 {
            0.0
        }

        fn sample_rate(&self) -> f32 {
            8000.0
        }
    }

    struct NullHttp;

    #[async_trait]
    impl HttpClient for NullHttp {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Err(bridge_traits::BridgeError::NotAvailable("offline".to_string()))
        }
    }

    #[test]
    fn test_builder_with_explicit_capabilities() {
        let config = AudioFxConfig::builder()
            .backend(Arc::new(NullBackend))
            .http_client(Arc::new(NullHttp))
            .build()
            .unwrap();

        assert_eq!(config.backend.sample_rate(), 8000.0);
        assert_eq!(config.backend.max_frequency(), 4000.0);
        assert!(format!("{:?}", config).contains("AudioBackend"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_backend_is_reported() {
        let err = AudioFxConfig::builder()
            .http_client(Arc::new(NullHttp))
            .build()
            .unwrap_err();

        match err {
            Error::CapabilityMissing { capability, .. } => assert_eq!(capability, "AudioBackend"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_http_client_is_reported() {
        let err = AudioFxConfig::builder()
            .backend(Arc::new(NullBackend))
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::CapabilityMissing { ref capability, .. } if capability == "HttpClient"));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_desktop_defaults_fill_missing_capabilities() {
        let config = AudioFxConfig::builder().build().unwrap();
        assert!(config.backend.sample_rate() > 0.0);
    }
}
