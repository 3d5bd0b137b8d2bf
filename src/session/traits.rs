//! The session capability the engine is built on.

use super::error::SessionResult;
use crate::sync::{GenerationConfig, WeightedPrompt};
use crossbeam::channel::{Receiver, Sender, unbounded};
use std::fmt;

/// An established session with the generation backend.
///
/// Every call is fire-and-forget: `Ok` means the request was handed to the
/// transport, not that the server acted on it.
pub trait Session {
    fn play(&mut self) -> SessionResult<()>;

    fn pause(&mut self) -> SessionResult<()>;

    fn stop(&mut self) -> SessionResult<()>;

    /// Ask the server to drop its generation context.
    fn reset_context(&mut self) -> SessionResult<()>;

    fn set_weighted_prompts(&mut self, prompts: &[WeightedPrompt]) -> SessionResult<()>;

    fn set_music_generation_config(&mut self, config: &GenerationConfig) -> SessionResult<()>;

    /// Release the transport. Called when the engine abandons the session.
    fn close(&mut self) {}
}

/// Opens sessions.
pub trait SessionConnector {
    type Session: Session;

    /// Connect to `model`, delivering everything the server sends to `inbound`.
    fn connect(&mut self, model: &str, inbound: SessionSender) -> SessionResult<Self::Session>;
}

/// What the server can send.
#[derive(Clone, PartialEq)]
pub enum ServerMessage {
    SetupComplete,
    FilteredPrompt { text: String, reason: String },
    AudioChunk {
        data: Vec<u8>,
        sample_rate: u32,
        channels: u16,
    },
}

impl fmt::Debug for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetupComplete => f.write_str("SetupComplete"),
            Self::FilteredPrompt { text, reason } => f
                .debug_struct("FilteredPrompt")
                .field("text", text)
                .field("reason", reason)
                .finish(),
            Self::AudioChunk {
                data,
                sample_rate,
                channels,
            } => f
                .debug_struct("AudioChunk")
                .field("bytes", &data.len())
                .field("sample_rate", sample_rate)
                .field("channels", channels)
                .finish(),
        }
    }
}

/// One inbound event, tagged by the handler it came through.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Message(ServerMessage),
    Error(String),
    Closed,
}

/// Inbound handlers handed to [`SessionConnector::connect`].
///
/// Cheap to clone and safe to move to the transport's own thread. Each
/// connection gets its own channel, so a sender kept by a dead session
/// reaches nobody once the engine reconnects.
#[derive(Debug, Clone)]
pub struct SessionSender {
    tx: Sender<SessionEvent>,
}

impl SessionSender {
    /// A sender and the receiver its events arrive on.
    pub fn channel() -> (Self, Receiver<SessionEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }

    /// Deliver a server message. Returns `false` if nobody listens anymore.
    pub fn on_message(&self, message: ServerMessage) -> bool {
        self.tx.send(SessionEvent::Message(message)).is_ok()
    }

    /// Report a transport error.
    pub fn on_error(&self, error: impl fmt::Display) -> bool {
        self.tx.send(SessionEvent::Error(error.to_string())).is_ok()
    }

    /// Report that the transport closed.
    pub fn on_close(&self) -> bool {
        self.tx.send(SessionEvent::Closed).is_ok()
    }
}
