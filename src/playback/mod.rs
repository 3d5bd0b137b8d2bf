//! Audio output and the playback state machine.
//!
//! This module provides:
//! - [`AudioOutput`], the hardware-clock abstraction everything is scheduled on
//! - [`ClockScheduler`], which owns the output gain and places buffers in time
//! - [`PlaybackController`], the `stopped | loading | playing | paused` machine
//! - [`VirtualOutput`] for headless hosts and tests, and `CpalOutput` for real
//!   devices (feature `playback`)

pub mod clock_scheduler;
pub mod controller;
pub mod error;
pub mod gain;
pub mod state;
pub mod traits;
pub mod virtual_output;

#[cfg(feature = "playback")]
pub mod cpal_output;

pub use clock_scheduler::{ClockScheduler, ClockStats};
pub use controller::PlaybackController;
pub use error::{PlaybackError, PlaybackResult};
pub use gain::GainRamp;
pub use state::PlaybackState;
pub use traits::AudioOutput;
pub use virtual_output::{DEFAULT_RETENTION, ScheduledVoice, VirtualOutput};

#[cfg(feature = "playback")]
pub use cpal_output::CpalOutput;
