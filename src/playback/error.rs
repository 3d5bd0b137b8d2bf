//! Error types for audio output operations.

/// Playback-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    /// No output device could be opened
    #[error("No audio output device available")]
    NoOutputDevice,

    /// Buffer does not match the output format
    #[error("Unsupported format: {expected} expected, got {actual}")]
    UnsupportedFormat { expected: String, actual: String },

    /// Backend-specific errors (CPAL, etc.)
    #[error("Backend error: {backend} - {details}")]
    Backend {
        backend: &'static str,
        details: String,
    },
}

impl PlaybackError {
    /// Create an unsupported format error
    pub fn unsupported_format(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a backend error
    pub fn backend(backend: &'static str, details: impl Into<String>) -> Self {
        Self::Backend {
            backend,
            details: details.into(),
        }
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::UnsupportedFormat { .. })
    }

    /// Check if this error indicates a device problem
    pub fn is_device_error(&self) -> bool {
        matches!(self, Self::NoOutputDevice | Self::Backend { .. })
    }
}

/// Result type for playback operations
pub type PlaybackResult<T> = Result<T, PlaybackError>;

/// Convert CPAL errors to PlaybackError
#[cfg(feature = "playback")]
impl From<cpal::BuildStreamError> for PlaybackError {
    fn from(err: cpal::BuildStreamError) -> Self {
        Self::backend("cpal", format!("Failed to build stream: {}", err))
    }
}

#[cfg(feature = "playback")]
impl From<cpal::PlayStreamError> for PlaybackError {
    fn from(err: cpal::PlayStreamError) -> Self {
        Self::backend("cpal", format!("Failed to play stream: {}", err))
    }
}
