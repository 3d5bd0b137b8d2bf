//! Generation config and the throttled config uploader.
//!
//! Density and brightness are three-valued on the wire: an absent field lets
//! the server steer it, a present one overrides. [`ConfigSync`] keeps an
//! auto flag per field and remembers the last explicit value so switching
//! auto off restores it.

use super::throttle::Throttle;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Musical scale the model is asked to stay in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scale {
    CMajorAMinor,
    DFlatMajorBFlatMinor,
    DMajorBMinor,
    EFlatMajorCMinor,
    EMajorDFlatMinor,
    FMajorDMinor,
    GFlatMajorEFlatMinor,
    GMajorEMinor,
    AFlatMajorFMinor,
    AMajorGFlatMinor,
    BFlatMajorGMinor,
    BMajorAFlatMinor,
    ScaleUnspecified,
}

/// Trade-off the model makes between fidelity and variety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MusicGenerationMode {
    #[default]
    Quality,
    Diversity,
}

/// Sparse generation parameters. `None` fields are left out of the push.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpm: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Scale>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music_generation_mode: Option<MusicGenerationMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mute_bass: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mute_drums: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only_bass_and_drums: Option<bool>,
}

impl GenerationConfig {
    /// The settings a fresh session starts from.
    pub fn defaults() -> Self {
        Self {
            temperature: Some(1.1),
            top_k: Some(40),
            guidance: Some(4.0),
            music_generation_mode: Some(MusicGenerationMode::Quality),
            ..Self::default()
        }
    }
}

/// One user edit to the generation settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigEdit {
    Temperature(Option<f32>),
    TopK(Option<u32>),
    Guidance(Option<f32>),
    Seed(Option<i64>),
    Bpm(Option<u32>),
    /// An explicit density switches auto density off; `None` switches it on.
    Density(Option<f32>),
    /// An explicit brightness switches auto brightness off; `None` switches it on.
    Brightness(Option<f32>),
    Scale(Option<Scale>),
    Mode(Option<MusicGenerationMode>),
    MuteBass(bool),
    MuteDrums(bool),
    OnlyBassAndDrums(bool),
    AutoDensity(bool),
    AutoBrightness(bool),
}

/// One auto-controllable field.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AutoField {
    auto: bool,
    last_defined: Option<f32>,
}

impl AutoField {
    const fn new() -> Self {
        Self {
            auto: true,
            last_defined: None,
        }
    }

    /// Apply an explicit value (or its removal) and return the wire value.
    fn set(&mut self, value: Option<f32>) -> Option<f32> {
        match value {
            Some(v) => {
                let v = v.clamp(0.0, 1.0);
                self.last_defined = Some(v);
                self.auto = false;
                Some(v)
            }
            None => {
                self.auto = true;
                None
            }
        }
    }

    /// Toggle auto and return the wire value.
    fn toggle(&mut self, auto: bool) -> Option<f32> {
        self.auto = auto;
        if auto { None } else { self.last_defined }
    }
}

/// Holds the generation config and decides when to push it.
#[derive(Debug, Clone)]
pub struct ConfigSync {
    config: GenerationConfig,
    density: AutoField,
    brightness: AutoField,
    throttle: Throttle,
}

impl ConfigSync {
    pub fn new(window: Duration) -> Self {
        Self {
            config: GenerationConfig::defaults(),
            density: AutoField::new(),
            brightness: AutoField::new(),
            throttle: Throttle::new(window),
        }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn auto_density(&self) -> bool {
        self.density.auto
    }

    pub fn auto_brightness(&self) -> bool {
        self.brightness.auto
    }

    pub fn last_defined_density(&self) -> Option<f32> {
        self.density.last_defined
    }

    pub fn last_defined_brightness(&self) -> Option<f32> {
        self.brightness.last_defined
    }

    /// Apply one edit and schedule a push.
    pub fn edit(&mut self, edit: ConfigEdit, now: Duration) {
        let config = &mut self.config;
        match edit {
            ConfigEdit::Temperature(v) => config.temperature = v,
            ConfigEdit::TopK(v) => config.top_k = v,
            ConfigEdit::Guidance(v) => config.guidance = v,
            ConfigEdit::Seed(v) => config.seed = v,
            ConfigEdit::Bpm(v) => config.bpm = v,
            ConfigEdit::Density(v) => config.density = self.density.set(v),
            ConfigEdit::Brightness(v) => config.brightness = self.brightness.set(v),
            ConfigEdit::Scale(v) => config.scale = v,
            ConfigEdit::Mode(v) => config.music_generation_mode = v,
            ConfigEdit::MuteBass(v) => config.mute_bass = Some(v),
            ConfigEdit::MuteDrums(v) => config.mute_drums = Some(v),
            ConfigEdit::OnlyBassAndDrums(v) => config.only_bass_and_drums = Some(v),
            ConfigEdit::AutoDensity(auto) => config.density = self.density.toggle(auto),
            ConfigEdit::AutoBrightness(auto) => {
                config.brightness = self.brightness.toggle(auto)
            }
        }
        tracing::trace!(?edit, "generation config edited");
        self.throttle.request(now);
    }

    /// Replace the whole config, as when a host restores saved settings.
    ///
    /// Explicit density or brightness values switch their auto flag off and
    /// become the last defined value; absent ones switch it on.
    pub fn set_config(&mut self, config: GenerationConfig, now: Duration) {
        self.density.set(config.density);
        self.brightness.set(config.brightness);
        self.config = GenerationConfig {
            density: config.density.map(|v| v.clamp(0.0, 1.0)),
            brightness: config.brightness.map(|v| v.clamp(0.0, 1.0)),
            ..config
        };
        self.throttle.request(now);
    }

    /// Back to the defaults with auto density and brightness on and no
    /// remembered values. Nothing is scheduled; the caller flushes.
    pub fn reset_to_defaults(&mut self) {
        self.config = GenerationConfig::defaults();
        self.density = AutoField::new();
        self.brightness = AutoField::new();
    }

    /// The config to push if the throttle window closed by `now`.
    pub fn due(&mut self, now: Duration) -> Option<GenerationConfig> {
        self.throttle.due(now).then(|| self.config.clone())
    }

    /// The config to push right away; any open window is dropped.
    pub fn flush(&mut self) -> GenerationConfig {
        self.throttle.cancel();
        self.config.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.throttle.is_pending()
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.throttle.deadline()
    }
}
