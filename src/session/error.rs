//! Error types for the remote generation session.

/// Session-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Establishing the session failed
    #[error("Failed to connect to {model}: {details}")]
    Connect { model: String, details: String },

    /// The transport reported an error
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// The remote side closed the session
    #[error("Session closed")]
    Closed,

    /// No usable session; reconnect first
    #[error("Not connected")]
    NotConnected,

    /// The session refused a prompt or config update
    #[error("Update rejected: {0}")]
    Rejected(String),

    /// A frame could not be understood
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Audio payload was not valid base64
    #[error("Invalid audio payload: {0}")]
    Payload(#[from] base64::DecodeError),
}

impl SessionError {
    /// Create a connect error
    pub fn connect(model: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Connect {
            model: model.into(),
            details: details.into(),
        }
    }

    /// Create a connection-lost error
    pub fn connection_lost(details: impl Into<String>) -> Self {
        Self::ConnectionLost(details.into())
    }

    /// Create a rejection error
    pub fn rejected(details: impl Into<String>) -> Self {
        Self::Rejected(details.into())
    }

    /// Create a protocol error
    pub fn protocol(details: impl Into<String>) -> Self {
        Self::Protocol(details.into())
    }

    /// Whether the session is gone and must be re-established.
    pub fn is_connection_loss(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::ConnectionLost(_) | Self::Closed | Self::NotConnected
        )
    }

    /// Whether the session stays usable after this error.
    pub fn is_recoverable(&self) -> bool {
        !self.is_connection_loss()
    }
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
