//! Top-level error type.

use crate::playback::PlaybackError;
use crate::session::SessionError;
use crate::streaming::StreamError;
use thiserror::Error;

/// Convenience type alias for engine results
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the engine and its configuration.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Audio output failed
    #[error(transparent)]
    Playback(#[from] PlaybackError),

    /// A chunk could not be decoded or scheduled
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// The session failed
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Configuration is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// The engine task is gone
    #[error("Engine is shut down")]
    Shutdown,
}

impl EngineError {
    /// Create an invalid configuration error
    pub fn invalid_config(details: impl Into<String>) -> Self {
        Self::InvalidConfig(details.into())
    }

    /// Whether the engine can keep running after this error.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Playback(e) => e.is_recoverable(),
            Self::Stream(e) => e.is_recoverable(),
            Self::Session(e) => e.is_recoverable(),
            Self::InvalidConfig(_) | Self::ConfigParse(_) | Self::Shutdown => false,
        }
    }
}
