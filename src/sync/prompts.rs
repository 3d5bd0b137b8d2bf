//! Prompts and the throttled weighted-prompt uploader.

use super::throttle::Throttle;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Highest weight a prompt can carry.
pub const MAX_WEIGHT: f32 = 2.0;

/// Clamp a weight into `[0, MAX_WEIGHT]`. NaN becomes zero.
pub fn clamp_weight(weight: f32) -> f32 {
    if weight.is_nan() {
        0.0
    } else {
        weight.clamp(0.0, MAX_WEIGHT)
    }
}

/// A text label steering generation, with its intensity and display color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub id: String,
    pub text: String,
    pub weight: f32,
    pub color: String,
}

impl Prompt {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        weight: f32,
        color: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            weight: clamp_weight(weight),
            color: color.into(),
        }
    }
}

fn clamped(prompt: Prompt) -> Prompt {
    Prompt {
        weight: clamp_weight(prompt.weight),
        ..prompt
    }
}

/// What the session receives for one prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedPrompt {
    pub id: String,
    pub text: String,
    pub weight: f32,
}

impl From<&Prompt> for WeightedPrompt {
    fn from(prompt: &Prompt) -> Self {
        Self {
            id: prompt.id.clone(),
            text: prompt.text.clone(),
            weight: prompt.weight,
        }
    }
}

/// Prompt texts the server refused. Append-only until the next connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredPromptSet {
    texts: HashSet<String>,
}

impl FilteredPromptSet {
    /// Add `text`. Returns whether it was new.
    pub fn insert(&mut self, text: impl Into<String>) -> bool {
        self.texts.insert(text.into())
    }

    pub fn contains(&self, text: &str) -> bool {
        self.texts.contains(text)
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn clear(&mut self) {
        self.texts.clear();
    }
}

/// Holds the prompt list and decides when to push it.
#[derive(Debug, Clone)]
pub struct PromptSync {
    prompts: Vec<Prompt>,
    filtered: FilteredPromptSet,
    throttle: Throttle,
}

impl PromptSync {
    pub fn new(window: Duration) -> Self {
        Self {
            prompts: Vec::new(),
            filtered: FilteredPromptSet::default(),
            throttle: Throttle::new(window),
        }
    }

    /// Start from `prompts` without scheduling a push.
    pub fn with_prompts(window: Duration, prompts: Vec<Prompt>) -> Self {
        let mut sync = Self::new(window);
        sync.prompts = prompts.into_iter().map(clamped).collect();
        sync
    }

    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    pub fn filtered(&self) -> &FilteredPromptSet {
        &self.filtered
    }

    /// Replace the whole list. Weights are clamped.
    pub fn set_prompts(&mut self, prompts: Vec<Prompt>, now: Duration) {
        self.prompts = prompts.into_iter().map(clamped).collect();
        self.throttle.request(now);
    }

    /// Change one prompt's weight. Returns `false` if no prompt has `id`.
    pub fn set_weight(&mut self, id: &str, weight: f32, now: Duration) -> bool {
        let Some(prompt) = self.prompts.iter_mut().find(|p| p.id == id) else {
            return false;
        };
        prompt.weight = clamp_weight(weight);
        self.throttle.request(now);
        true
    }

    /// Replace the prompt with the same id. Returns `false` if there is none.
    pub fn edit(&mut self, prompt: Prompt, now: Duration) -> bool {
        let Some(slot) = self.prompts.iter_mut().find(|p| p.id == prompt.id) else {
            return false;
        };
        *slot = clamped(prompt);
        self.throttle.request(now);
        true
    }

    /// Record a text the server filtered. Returns whether it was new.
    pub fn filter(&mut self, text: impl Into<String>) -> bool {
        self.filtered.insert(text)
    }

    pub fn clear_filtered(&mut self) {
        self.filtered.clear();
    }

    /// Prompts that may be sent: non-zero weight and not filtered.
    pub fn weighted_prompts(&self) -> Vec<WeightedPrompt> {
        self.prompts
            .iter()
            .filter(|p| p.weight > 0.0 && !self.filtered.contains(&p.text))
            .map(WeightedPrompt::from)
            .collect()
    }

    /// The set to push if the throttle window closed by `now`.
    pub fn due(&mut self, now: Duration) -> Option<Vec<WeightedPrompt>> {
        self.throttle.due(now).then(|| self.weighted_prompts())
    }

    /// The set to push right away; any open window is dropped.
    pub fn flush(&mut self) -> Vec<WeightedPrompt> {
        self.throttle.cancel();
        self.weighted_prompts()
    }

    pub fn is_pending(&self) -> bool {
        self.throttle.is_pending()
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.throttle.deadline()
    }
}
