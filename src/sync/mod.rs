//! Throttled upstream synchronisation of prompts and generation settings.
//!
//! Both uploaders follow the same shape: edits update local state and open a
//! [`Throttle`] window; when the window closes the engine pushes whatever
//! the state is then. Reconnect and reset bypass the window with `flush`.

pub mod generation;
pub mod prompts;
pub mod throttle;

pub use generation::{ConfigEdit, ConfigSync, GenerationConfig, MusicGenerationMode, Scale};
pub use prompts::{
    FilteredPromptSet, MAX_WEIGHT, Prompt, PromptSync, WeightedPrompt, clamp_weight,
};
pub use throttle::Throttle;
