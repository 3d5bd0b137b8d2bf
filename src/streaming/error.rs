//! Error types for chunk decoding and scheduling.

use crate::playback::PlaybackError;

/// Streaming-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Chunk payload could not be decoded into PCM
    #[error("Decode error: {0}")]
    Decode(String),

    /// Chunk format does not match what the output can play
    #[error("Format mismatch: expected {expected}, got {actual}")]
    FormatMismatch { expected: String, actual: String },

    /// Sample-rate conversion failed
    #[error("Resampling from {from} Hz to {to} Hz failed: {details}")]
    Resample { from: u32, to: u32, details: String },

    /// The output refused a scheduled buffer
    #[error("Output error: {0}")]
    Output(#[from] PlaybackError),
}

impl StreamError {
    /// Create a decode error
    pub fn decode(details: impl Into<String>) -> Self {
        Self::Decode(details.into())
    }

    /// Create a format mismatch error
    pub fn format_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::FormatMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a resampling error
    pub fn resample(from: u32, to: u32, details: impl Into<String>) -> Self {
        Self::Resample {
            from,
            to,
            details: details.into(),
        }
    }

    /// Check if the stream can carry on after this error.
    ///
    /// A single bad chunk is dropped; output failures defer to the output.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Output(e) => e.is_recoverable(),
            _ => true,
        }
    }
}

/// Result type for streaming operations
pub type StreamResult<T> = Result<T, StreamError>;
