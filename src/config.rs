//! Engine configuration.
//!
//! Every field has a default, so a partial JSON document (or none at all)
//! yields a working configuration. Durations are milliseconds in JSON.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Model requested when none is configured.
pub const DEFAULT_MODEL: &str = "lyria-realtime-exp";

/// Tunables for an [`Engine`](crate::Engine) and its driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Model id passed to the connector
    pub model: String,

    /// Output sample rate in Hz
    pub sample_rate: u32,

    /// Output channel count (1 or 2)
    pub channels: u16,

    /// Audio queued before playback is declared started
    #[serde(rename = "lookahead_ms", with = "millis")]
    pub lookahead: Duration,

    /// Minimum spacing of prompt and config pushes
    #[serde(rename = "throttle_window_ms", with = "millis")]
    pub throttle_window: Duration,

    /// Length of the fade on play and pause
    #[serde(rename = "gain_ramp_ms", with = "millis")]
    pub gain_ramp: Duration,

    /// Delay between a context reset and the automatic replay
    #[serde(rename = "reset_rearm_ms", with = "millis")]
    pub reset_rearm: Duration,

    /// Underruns within `underrun_notice_window` that raise a notice
    pub underrun_notice_threshold: usize,

    #[serde(rename = "underrun_notice_window_ms", with = "millis")]
    pub underrun_notice_window: Duration,

    /// How often the driver ticks the engine
    #[serde(rename = "tick_interval_ms", with = "millis")]
    pub tick_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            sample_rate: 48_000,
            channels: 2,
            lookahead: Duration::from_secs(2),
            throttle_window: Duration::from_millis(200),
            gain_ramp: Duration::from_millis(100),
            reset_rearm: Duration::from_millis(100),
            underrun_notice_threshold: 3,
            underrun_notice_window: Duration::from_secs(10),
            tick_interval: Duration::from_millis(10),
        }
    }
}

impl EngineConfig {
    /// Short look-ahead for reliable local links
    pub fn low_latency() -> Self {
        Self {
            lookahead: Duration::from_millis(500),
            throttle_window: Duration::from_millis(100),
            tick_interval: Duration::from_millis(5),
            ..Self::default()
        }
    }

    /// Long look-ahead for jittery networks
    pub fn network_streaming() -> Self {
        Self {
            lookahead: Duration::from_secs(4),
            throttle_window: Duration::from_millis(300),
            underrun_notice_window: Duration::from_secs(30),
            ..Self::default()
        }
    }

    /// Parse a JSON document, filling gaps with defaults, and validate it.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> EngineResult<()> {
        if self.sample_rate == 0 {
            return Err(EngineError::invalid_config("sample_rate must be non-zero"));
        }
        if !(1..=2).contains(&self.channels) {
            return Err(EngineError::invalid_config(format!(
                "channels must be 1 or 2, got {}",
                self.channels
            )));
        }
        if self.lookahead.is_zero() {
            return Err(EngineError::invalid_config("lookahead must be non-zero"));
        }
        if self.throttle_window.is_zero() {
            return Err(EngineError::invalid_config("throttle window must be non-zero"));
        }
        if self.tick_interval.is_zero() {
            return Err(EngineError::invalid_config("tick interval must be non-zero"));
        }
        if self.model.trim().is_empty() {
            return Err(EngineError::invalid_config("model must not be empty"));
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
