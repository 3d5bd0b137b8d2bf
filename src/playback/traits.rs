//! Core traits for audio output.

use super::error::PlaybackResult;
use crate::streaming::ScheduledBuffer;

/// An audio output with its own hardware clock.
///
/// Times are seconds on the output clock (the equivalent of a web audio
/// context's `currentTime`). The clock only moves forward and keeps running
/// while nothing is scheduled.
pub trait AudioOutput {
    /// Current position of the hardware clock, in seconds.
    fn current_time(&self) -> f64;

    /// Output sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Interleaved output channel count.
    fn channels(&self) -> u16;

    /// Make sure the device is running. Called on every user play.
    fn resume(&mut self) -> PlaybackResult<()>;

    /// Play `buffer` starting at `start_at` on the output clock.
    fn schedule(&mut self, buffer: ScheduledBuffer, start_at: f64) -> PlaybackResult<()>;

    /// Set the master gain immediately.
    fn set_gain(&mut self, gain: f32);

    /// Ramp the master gain linearly from its current value to `target`
    /// over `seconds`, starting now.
    fn ramp_gain(&mut self, target: f32, seconds: f64);

    /// Silence everything scheduled at or after `at`.
    ///
    /// Buffers that start at or after `at` are dropped; buffers sounding at
    /// `at` are cut there. Returns how many buffers were affected.
    fn cut_after(&mut self, at: f64) -> usize;
}

impl<O: AudioOutput + ?Sized> AudioOutput for Box<O> {
    fn current_time(&self) -> f64 {
        (**self).current_time()
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn channels(&self) -> u16 {
        (**self).channels()
    }

    fn resume(&mut self) -> PlaybackResult<()> {
        (**self).resume()
    }

    fn schedule(&mut self, buffer: ScheduledBuffer, start_at: f64) -> PlaybackResult<()> {
        (**self).schedule(buffer, start_at)
    }

    fn set_gain(&mut self, gain: f32) {
        (**self).set_gain(gain)
    }

    fn ramp_gain(&mut self, target: f32, seconds: f64) {
        (**self).ramp_gain(target, seconds)
    }

    fn cut_after(&mut self, at: f64) -> usize {
        (**self).cut_after(at)
    }
}
