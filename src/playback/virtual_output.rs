//! An in-memory output driven by a [`Clock`].
//!
//! Nothing is rendered; the output keeps a timeline of what would have
//! played and when. Voices that finished more than the retention window ago
//! are pruned, and only the most recent gain changes are kept, so a
//! long-running headless host holds bounded memory. Headless hosts use it to run the engine without a
//! device, and the test suites use it with a [`ManualClock`](crate::ManualClock)
//! to step time deterministically.

use super::error::{PlaybackError, PlaybackResult};
use super::gain::GainRamp;
use super::traits::AudioOutput;
use crate::clock::Clock;
use crate::streaming::ScheduledBuffer;
use std::sync::Arc;
use std::time::Duration;

/// Finished voices are kept this long by default.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(60);

/// Gain changes kept in the history.
const GAIN_HISTORY_LEN: usize = 256;

/// One buffer placed on the virtual timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledVoice {
    /// Start time on the output clock.
    pub start: f64,
    /// End time, earlier than `start + duration` if the voice was cut.
    pub end: f64,
    /// Frames in the buffer.
    pub frames: usize,
}

impl ScheduledVoice {
    pub fn is_sounding_at(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }
}

/// Clock-driven output that records scheduled buffers and gain automation.
pub struct VirtualOutput {
    clock: Arc<dyn Clock>,
    sample_rate: u32,
    channels: u16,
    voices: Vec<ScheduledVoice>,
    gain: GainRamp,
    gain_history: Vec<GainRamp>,
    retention: Duration,
    resumes: usize,
}

impl VirtualOutput {
    pub fn new(clock: Arc<dyn Clock>, sample_rate: u32, channels: u16) -> Self {
        Self {
            clock,
            sample_rate,
            channels,
            voices: Vec::new(),
            gain: GainRamp::constant(0.0),
            gain_history: Vec::new(),
            retention: DEFAULT_RETENTION,
            resumes: 0,
        }
    }

    /// Keep finished voices for `retention` after they end.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Buffers still pending, sounding, or finished within the retention
    /// window, in scheduling order.
    pub fn voices(&self) -> &[ScheduledVoice] {
        &self.voices
    }

    /// Start times of the retained buffers.
    pub fn start_times(&self) -> Vec<f64> {
        self.voices.iter().map(|v| v.start).collect()
    }

    /// Gain in effect at time `t`.
    pub fn gain_at(&self, t: f64) -> f32 {
        self.gain.value_at(t)
    }

    /// The most recent gain changes, oldest first.
    pub fn gain_history(&self) -> &[GainRamp] {
        &self.gain_history
    }

    /// Whether anything would be heard at time `t`.
    pub fn is_audible_at(&self, t: f64) -> bool {
        self.gain_at(t) > 0.0 && self.voices.iter().any(|v| v.is_sounding_at(t))
    }

    /// How many times the output was resumed.
    pub const fn resumes(&self) -> usize {
        self.resumes
    }

    fn push_gain(&mut self, ramp: GainRamp) {
        self.gain = ramp;
        if self.gain_history.len() == GAIN_HISTORY_LEN {
            self.gain_history.remove(0);
        }
        self.gain_history.push(ramp);
    }

    fn prune(&mut self) {
        let horizon = self.current_time() - self.retention.as_secs_f64();
        let before = self.voices.len();
        self.voices.retain(|v| v.end >= horizon);
        let pruned = before - self.voices.len();
        if pruned > 0 {
            tracing::trace!(pruned, "dropped finished voices");
        }
    }
}

impl AudioOutput for VirtualOutput {
    fn current_time(&self) -> f64 {
        self.clock.now().as_secs_f64()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn resume(&mut self) -> PlaybackResult<()> {
        self.resumes += 1;
        Ok(())
    }

    fn schedule(&mut self, buffer: ScheduledBuffer, start_at: f64) -> PlaybackResult<()> {
        if buffer.sample_rate() != self.sample_rate || buffer.channels() != self.channels {
            return Err(PlaybackError::unsupported_format(
                format!("{} Hz x{}", self.sample_rate, self.channels),
                format!("{} Hz x{}", buffer.sample_rate(), buffer.channels()),
            ));
        }
        self.prune();
        self.voices.push(ScheduledVoice {
            start: start_at,
            end: start_at + buffer.duration(),
            frames: buffer.frames(),
        });
        Ok(())
    }

    fn set_gain(&mut self, gain: f32) {
        self.push_gain(GainRamp::constant(gain));
    }

    fn ramp_gain(&mut self, target: f32, seconds: f64) {
        let now = self.current_time();
        let ramp = self.gain.towards(now, target, seconds);
        self.push_gain(ramp);
    }

    fn cut_after(&mut self, at: f64) -> usize {
        let mut affected = 0;
        for voice in &mut self.voices {
            if voice.end <= at {
                continue;
            }
            voice.end = voice.start.max(at);
            affected += 1;
        }
        affected
    }
}
