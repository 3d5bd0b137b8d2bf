//! The remote generation session.
//!
//! The engine talks to the backend only through [`SessionConnector`] and
//! [`Session`]. [`SessionLifecycle`] owns the live session, gives every
//! connection its own inbound channel, and turns transport failures into a
//! broken flag the engine reacts to. [`wire`] provides a JSON framing for
//! text transports.

pub mod error;
pub mod lifecycle;
pub mod traits;
pub mod wire;

pub use error::{SessionError, SessionResult};
pub use lifecycle::{ConnectionStatus, Inbound, SessionLifecycle};
pub use traits::{ServerMessage, Session, SessionConnector, SessionEvent, SessionSender};
pub use wire::{
    ClientFrame, FrameSink, FramedConnector, FramedSession, PlaybackControl, deliver_frame,
    parse_server_frame,
};
