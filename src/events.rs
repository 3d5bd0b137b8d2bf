//! Events the engine reports to the presentation layer.

use crate::playback::PlaybackState;
use crate::sync::Prompt;
use crossbeam::channel::{Receiver, Sender, unbounded};
use serde::Serialize;
use std::fmt;

/// Message shown when the session is lost.
pub const CONNECTION_ERROR_MESSAGE: &str = "Connection error, please restart audio.";

/// What a [`Notice`] is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// The session failed or closed.
    ConnectionError,
    /// The server filtered a prompt.
    ModerationFilter,
    /// Underruns keep happening; the network cannot keep up.
    RecurringUnderrun,
    /// A prompt or config push was rejected.
    DispatchRejected,
}

/// A transient, user-facing message (a toast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connection_error() -> Self {
        Self::new(NoticeKind::ConnectionError, CONNECTION_ERROR_MESSAGE)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Everything the presentation layer renders from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum EngineEvent {
    StateChanged(PlaybackState),
    Notice(Notice),
    /// The prompt list changed (weights edited, texts replaced).
    WeightsChanged(Vec<Prompt>),
}

/// Sending half of the engine's event channel.
///
/// A dropped receiver is not an error: the engine keeps running headless.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Sender<EngineEvent>,
}

impl EventSink {
    /// Create a sink and the receiver the presentation layer drains.
    pub fn channel() -> (Self, Receiver<EngineEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: EngineEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("event receiver dropped");
        }
    }

    pub fn notice(&self, notice: Notice) {
        self.emit(EngineEvent::Notice(notice));
    }
}
