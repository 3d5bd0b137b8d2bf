// Correctness and logic
#![warn(clippy::unit_cmp)] // Detects comparing unit types
#![warn(clippy::match_same_arms)]
// Duplicate match arms

// Performance-focused
#![warn(clippy::inefficient_to_string)] // `format!("{}", x)` vs `x.to_string()`
#![warn(clippy::map_clone)] // Cloning inside `map()` unnecessarily
#![warn(clippy::unnecessary_to_owned)] // Detects redundant `.to_owned()` or `.clone()`
#![warn(clippy::box_collection)] // Warns on boxed `Vec`, `String`, etc.
#![warn(clippy::needless_collect)] // Avoids `.collect().iter()` chains

// Style and idiomatic Rust
#![warn(clippy::redundant_clone)] // Detects unnecessary `.clone()`
#![warn(clippy::needless_return)] // Avoids `return` at the end of functions
#![warn(clippy::let_unit_value)] // Avoids binding `()` to variables
#![warn(clippy::manual_map)] // Use `.map()` instead of manual `match`
#![cfg_attr(not(test), warn(clippy::unwrap_used))] // Avoids using `unwrap()`

// Maintainability
#![warn(clippy::missing_panics_doc)] // Docs for functions that might panic

//! # promptdj_engine
//!
//! Client-side engine for steering a remotely generated music stream.
//!
//! A generation service streams raw PCM chunks over a long-lived session.
//! The engine schedules those chunks gaplessly on the output's hardware
//! clock behind a look-ahead buffer, runs the
//! `stopped | loading | playing | paused` state machine, fades the output
//! on every transition, and keeps the service in sync with the user's
//! weighted prompts and generation settings through throttled pushes.
//!
//! ## Features
//!
//! - `streaming` (default): the tokio [`EngineDriver`] that ticks the engine
//!   and accepts commands through an [`EngineHandle`]
//! - `playback`: `CpalOutput`, output to a real device through cpal
//! - `realtime`: both of the above
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use promptdj_engine::{
//!     Engine, EngineCommand, EngineConfig, ManualClock, PlaybackState, VirtualOutput,
//! };
//! use promptdj_engine::session::FramedConnector;
//!
//! let clock = ManualClock::new();
//! let output = VirtualOutput::new(Arc::new(clock.clone()), 48_000, 2);
//! // Outgoing JSON frames land on `wire`; a transport would forward them.
//! let (frames, wire) = crossbeam::channel::unbounded::<String>();
//! let connector = FramedConnector::new(move |_inbound| Ok(frames.clone()));
//!
//! let (mut engine, _events) = Engine::builder(connector, output)
//!     .config(EngineConfig::default().with_model("models/demo"))
//!     .clock(Arc::new(clock))
//!     .build()
//!     .unwrap();
//!
//! engine.handle(EngineCommand::Play).unwrap();
//! assert_eq!(engine.state(), PlaybackState::Loading);
//! assert!(wire.try_iter().any(|frame| frame.contains("PLAY")));
//! ```
//!
//! ## Error handling
//!
//! Each subsystem has its own error type ([`PlaybackError`],
//! [`StreamError`], [`SessionError`]); [`EngineError`] wraps them for the
//! public entry points. Session failures never surface as errors from
//! [`Engine::tick`]: they stop playback and arrive as [`Notice`]s on the
//! event channel.

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod playback;
pub mod session;
pub mod streaming;
pub mod sync;

pub use crate::clock::{Clock, ManualClock, SystemClock, Timer};
pub use crate::config::{DEFAULT_MODEL, EngineConfig};
pub use crate::engine::{Engine, EngineBuilder, EngineCommand};
#[cfg(feature = "streaming")]
pub use crate::engine::{EngineDriver, EngineHandle};
pub use crate::error::{EngineError, EngineResult};
pub use crate::events::{CONNECTION_ERROR_MESSAGE, EngineEvent, Notice, NoticeKind};
pub use crate::playback::{AudioOutput, PlaybackError, PlaybackState, VirtualOutput};
#[cfg(feature = "playback")]
pub use crate::playback::CpalOutput;
pub use crate::session::{Session, SessionConnector, SessionError};
pub use crate::streaming::{AudioChunk, StreamError};
pub use crate::sync::{ConfigEdit, GenerationConfig, Prompt, WeightedPrompt};
