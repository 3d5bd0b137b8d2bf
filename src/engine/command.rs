//! User commands the engine accepts.

use crate::sync::{ConfigEdit, GenerationConfig, Prompt};

/// One user action, as the presentation layer reports it.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    /// The play button: pause when playing, cancel when loading, play otherwise.
    PlayPause,
    Play,
    Pause,
    Stop,
    /// Drop the generation context and start over with default settings.
    Reset,
    /// Replace the prompt list.
    SetPrompts(Vec<Prompt>),
    SetPromptWeight { id: String, weight: f32 },
    /// Replace the prompt with the same id.
    EditPrompt(Prompt),
    EditConfig(ConfigEdit),
    /// Replace the whole generation config.
    SetConfig(GenerationConfig),
}

impl EngineCommand {
    /// Whether the command changes playback state (as opposed to settings).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::PlayPause | Self::Play | Self::Pause | Self::Stop | Self::Reset
        )
    }
}
