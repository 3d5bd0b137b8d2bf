//! Places decoded buffers on the output clock and owns the master gain.

use super::error::PlaybackResult;
use super::traits::AudioOutput;
use crate::streaming::ScheduledBuffer;
use std::time::Duration;

/// Counters kept by the [`ClockScheduler`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClockStats {
    pub buffers_scheduled: u64,
    pub seconds_scheduled: f64,
    pub buffers_cut: u64,
}

/// Thin owner of the [`AudioOutput`]: scheduling, fades, and silencing.
///
/// Knows nothing about prompts, sessions, or playback state.
pub struct ClockScheduler<O> {
    output: O,
    fade: Duration,
    stats: ClockStats,
}

impl<O: AudioOutput> ClockScheduler<O> {
    /// Wrap `output`; fades take `fade` to complete.
    pub fn new(mut output: O, fade: Duration) -> Self {
        output.set_gain(0.0);
        Self {
            output,
            fade,
            stats: ClockStats::default(),
        }
    }

    /// Current hardware clock, in seconds.
    pub fn now(&self) -> f64 {
        self.output.current_time()
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    pub fn stats(&self) -> &ClockStats {
        &self.stats
    }

    pub fn sample_rate(&self) -> u32 {
        self.output.sample_rate()
    }

    pub fn channels(&self) -> u16 {
        self.output.channels()
    }

    /// Start the device and fade the master gain in from silence.
    pub fn fade_in(&mut self) -> PlaybackResult<()> {
        self.output.resume()?;
        self.output.set_gain(0.0);
        self.output.ramp_gain(1.0, self.fade.as_secs_f64());
        Ok(())
    }

    /// Fade out and drop everything that would still sound once the fade
    /// has finished.
    pub fn fade_out(&mut self) {
        self.output.ramp_gain(0.0, self.fade.as_secs_f64());
        let at = self.now() + self.fade.as_secs_f64();
        self.stats.buffers_cut += self.output.cut_after(at) as u64;
    }

    /// Silence immediately and drop everything not yet played.
    pub fn silence(&mut self) {
        self.output.set_gain(0.0);
        let at = self.now();
        self.stats.buffers_cut += self.output.cut_after(at) as u64;
    }

    /// Schedule `buffer` to start at `start_at` on the output clock.
    pub fn schedule(&mut self, buffer: ScheduledBuffer, start_at: f64) -> PlaybackResult<()> {
        let duration = buffer.duration();
        self.output.schedule(buffer, start_at)?;
        self.stats.buffers_scheduled += 1;
        self.stats.seconds_scheduled += duration;
        Ok(())
    }
}
