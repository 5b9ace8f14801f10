//! # Playback Error Types
//!
//! Errors raised by sound construction, loading and transport control.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur while loading or controlling a sound.
///
/// The type is `Clone` so a single failed load can be reported to every
/// caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    // ========================================================================
    // Usage Errors
    // ========================================================================
    /// A URL, option or argument was rejected before any work started.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Transport control was requested before the buffer finished loading.
    #[error("Sound is not ready: buffer still loading")]
    NotReady,

    /// The sound was destroyed and accepts no further operations.
    #[error("Sound has been destroyed")]
    Destroyed,

    // ========================================================================
    // Load Errors
    // ========================================================================
    /// Fetching the encoded resource failed.
    #[error("Failed to fetch {url}: {message}")]
    NetworkError { url: String, message: String },

    /// The host could not decode the fetched bytes.
    #[error("Failed to decode {url}: {message}")]
    DecodeError { url: String, message: String },

    // ========================================================================
    // Platform Errors
    // ========================================================================
    /// The host audio engine could not be initialized or provision nodes.
    #[error("Audio platform unavailable: {0}")]
    PlatformUnavailable(String),

    /// The host engine rejected a scheduling or stop request.
    #[error("Playback operation failed: {0}")]
    PlaybackFailed(String),
}

impl PlaybackError {
    /// Returns `true` if the error came from fetching or decoding a resource.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::NetworkError { .. } | PlaybackError::DecodeError { .. }
        )
    }

    /// Returns `true` if the error indicates a logic error at the call site.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::InvalidArgument(_) | PlaybackError::NotReady | PlaybackError::Destroyed
        )
    }

    pub(crate) fn network(url: &str, source: BridgeError) -> Self {
        PlaybackError::NetworkError {
            url: url.to_string(),
            message: source.to_string(),
        }
    }

    pub(crate) fn decode(url: &str, source: BridgeError) -> Self {
        PlaybackError::DecodeError {
            url: url.to_string(),
            message: source.to_string(),
        }
    }
}

impl From<BridgeError> for PlaybackError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::NotAvailable(what) => PlaybackError::PlatformUnavailable(what),
            other => PlaybackError::PlaybackFailed(other.to_string()),
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_not_available_maps_to_platform_unavailable() {
        let err: PlaybackError = BridgeError::NotAvailable("AudioContext".into()).into();
        assert_eq!(err, PlaybackError::PlatformUnavailable("AudioContext".into()));
    }

    #[test]
    fn bridge_operation_failure_maps_to_playback_failed() {
        let err: PlaybackError = BridgeError::OperationFailed("node gone".into()).into();
        assert!(matches!(err, PlaybackError::PlaybackFailed(ref m) if m.contains("node gone")));
    }

    #[test]
    fn classification_helpers() {
        let net = PlaybackError::network("a.ogg", BridgeError::OperationFailed("HTTP 404".into()));
        assert!(net.is_load_error());
        assert!(!net.is_usage_error());
        assert!(net.to_string().contains("a.ogg"));

        assert!(PlaybackError::NotReady.is_usage_error());
        assert!(PlaybackError::Destroyed.is_usage_error());
        assert!(!PlaybackError::PlatformUnavailable("x".into()).is_load_error());
    }
}
