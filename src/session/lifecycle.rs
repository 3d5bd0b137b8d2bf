//! Connecting, reconnecting, and routing what the session sends.

use super::error::{SessionError, SessionResult};
use super::traits::{ServerMessage, Session, SessionConnector, SessionEvent, SessionSender};
use crate::streaming::AudioChunk;
use crossbeam::channel::{Receiver, TryRecvError};
use serde::Serialize;

/// Where the session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No session, or the last one failed
    #[default]
    Disconnected,
    /// Connected, waiting for the server to finish setup
    AwaitingSetup,
    /// Setup complete
    Ready,
}

/// An inbound event, routed for the engine.
#[derive(Debug)]
pub enum Inbound {
    SetupComplete,
    Filtered { text: String, reason: String },
    Audio(AudioChunk),
    /// The session failed or closed; it is marked broken already.
    Lost(SessionError),
}

/// Owns the session and its inbound channel.
pub struct SessionLifecycle<C: SessionConnector> {
    connector: C,
    model: String,
    session: Option<C::Session>,
    inbound: Option<Receiver<SessionEvent>>,
    status: ConnectionStatus,
    broken: bool,
    connections: u64,
    next_sequence: u64,
}

impl<C: SessionConnector> SessionLifecycle<C> {
    pub fn new(connector: C, model: impl Into<String>) -> Self {
        Self {
            connector,
            model: model.into(),
            session: None,
            inbound: None,
            status: ConnectionStatus::Disconnected,
            broken: false,
            connections: 0,
            next_sequence: 0,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether the last session failed and must be replaced.
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Whether a connect is needed before the session can be used.
    pub fn needs_connect(&self) -> bool {
        self.broken || self.session.is_none()
    }

    /// Number of successful connects so far.
    pub fn connections(&self) -> u64 {
        self.connections
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn connector_mut(&mut self) -> &mut C {
        &mut self.connector
    }

    /// Open a new session, abandoning any previous one.
    ///
    /// The new session gets a fresh inbound channel; events still arriving
    /// from the old one are dropped.
    pub fn connect(&mut self) -> SessionResult<()> {
        self.drop_session();

        let (sender, inbound) = SessionSender::channel();
        match self.connector.connect(&self.model, sender) {
            Ok(session) => {
                self.session = Some(session);
                self.inbound = Some(inbound);
                self.status = ConnectionStatus::AwaitingSetup;
                self.broken = false;
                self.connections += 1;
                self.next_sequence = 0;
                tracing::info!(model = %self.model, connection = self.connections, "session connected");
                Ok(())
            }
            Err(e) => {
                self.broken = true;
                tracing::warn!(model = %self.model, error = %e, "session connect failed");
                Err(e)
            }
        }
    }

    /// Abandon the session after a failure.
    pub fn mark_broken(&mut self) {
        if !self.broken {
            tracing::warn!(model = %self.model, "session marked broken");
        }
        self.broken = true;
        self.drop_session();
    }

    fn drop_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
        }
        self.inbound = None;
        self.status = ConnectionStatus::Disconnected;
    }

    /// Run `f` against the live session.
    ///
    /// Returns [`SessionError::NotConnected`] while broken or disconnected.
    pub fn with_session<T>(
        &mut self,
        f: impl FnOnce(&mut C::Session) -> SessionResult<T>,
    ) -> SessionResult<T> {
        if self.broken {
            return Err(SessionError::NotConnected);
        }
        let session = self.session.as_mut().ok_or(SessionError::NotConnected)?;
        f(session)
    }

    /// Next inbound event, if one is queued.
    pub fn poll(&mut self) -> Option<Inbound> {
        let inbound = self.inbound.as_ref()?;
        let event = match inbound.try_recv() {
            Ok(event) => event,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => SessionEvent::Closed,
        };
        Some(self.route(event))
    }

    fn route(&mut self, event: SessionEvent) -> Inbound {
        match event {
            SessionEvent::Message(ServerMessage::SetupComplete) => {
                self.status = ConnectionStatus::Ready;
                tracing::debug!(model = %self.model, "session setup complete");
                Inbound::SetupComplete
            }
            SessionEvent::Message(ServerMessage::FilteredPrompt { text, reason }) => {
                Inbound::Filtered { text, reason }
            }
            SessionEvent::Message(ServerMessage::AudioChunk {
                data,
                sample_rate,
                channels,
            }) => {
                let sequence = self.next_sequence;
                self.next_sequence += 1;
                Inbound::Audio(AudioChunk::new(data, sample_rate, channels).with_sequence(sequence))
            }
            SessionEvent::Error(details) => {
                self.mark_broken();
                Inbound::Lost(SessionError::ConnectionLost(details))
            }
            SessionEvent::Closed => {
                self.mark_broken();
                Inbound::Lost(SessionError::Closed)
            }
        }
    }
}

impl<C: SessionConnector> std::fmt::Debug for SessionLifecycle<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLifecycle")
            .field("model", &self.model)
            .field("status", &self.status)
            .field("broken", &self.broken)
            .field("connections", &self.connections)
            .finish_non_exhaustive()
    }
}
