//! The four playback states the presentation layer renders from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Current state of playback.
///
/// Exactly one state holds at any instant. Only the
/// [`PlaybackController`](super::PlaybackController) changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Nothing playing; the session may be closed
    #[default]
    Stopped,
    /// Waiting for the look-ahead buffer to fill
    Loading,
    /// Audio is audible
    Playing,
    /// Silenced by the user or by a rejected dispatch
    Paused,
}

impl PlaybackState {
    /// Whether incoming audio should be scheduled in this state.
    pub const fn accepts_audio(self) -> bool {
        matches!(self, Self::Loading | Self::Playing)
    }

    /// Whether a user play action starts loading from here.
    pub const fn can_play(self) -> bool {
        matches!(self, Self::Stopped | Self::Paused)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Loading => "loading",
            Self::Playing => "playing",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
