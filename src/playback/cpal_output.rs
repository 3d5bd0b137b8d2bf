//! Device output through cpal.
//!
//! The callback thread and the engine share one [`Timeline`] behind a
//! `parking_lot::Mutex`. The number of frames the device has consumed is the
//! hardware clock; scheduled buffers are mixed in at their start frame and
//! the master gain ramp is evaluated per frame.

use super::error::{PlaybackError, PlaybackResult};
use super::gain::GainRamp;
use super::traits::AudioOutput;
use crate::streaming::ScheduledBuffer;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use parking_lot::Mutex;
use std::sync::Arc;

struct Voice {
    start: u64,
    end: u64,
    samples: Vec<f32>,
}

struct Timeline {
    frames_played: u64,
    sample_rate: u32,
    channels: usize,
    voices: Vec<Voice>,
    gain: GainRamp,
}

impl Timeline {
    fn seconds(&self, frame: u64) -> f64 {
        frame as f64 / self.sample_rate as f64
    }

    fn frame_at(&self, seconds: f64) -> u64 {
        (seconds.max(0.0) * self.sample_rate as f64).round() as u64
    }

    fn now(&self) -> f64 {
        self.seconds(self.frames_played)
    }

    fn render(&mut self, data: &mut [f32]) {
        for frame in data.chunks_mut(self.channels) {
            let t = self.frames_played;
            frame.fill(0.0);
            for voice in self.voices.iter().filter(|v| v.start <= t && t < v.end) {
                let offset = (t - voice.start) as usize * self.channels;
                for (c, out) in frame.iter_mut().enumerate() {
                    *out += voice.samples.get(offset + c).copied().unwrap_or(0.0);
                }
            }
            let gain = self.gain.value_at(self.seconds(t));
            frame.iter_mut().for_each(|s| *s *= gain);
            self.frames_played += 1;
        }
        let now = self.frames_played;
        self.voices.retain(|v| v.end > now);
    }
}

/// Output to the default cpal device.
pub struct CpalOutput {
    timeline: Arc<Mutex<Timeline>>,
    stream: Stream,
    sample_rate: u32,
    channels: u16,
}

impl CpalOutput {
    /// Open the default output device at `sample_rate` with `channels`.
    ///
    /// The stream is built paused; the first [`AudioOutput::resume`] starts it.
    pub fn open(sample_rate: u32, channels: u16) -> PlaybackResult<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(PlaybackError::NoOutputDevice)?;
        tracing::info!(
            device = %device.name().unwrap_or_else(|_| "unknown".into()),
            sample_rate,
            channels,
            "opening output device"
        );

        let config = StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let timeline = Arc::new(Mutex::new(Timeline {
            frames_played: 0,
            sample_rate,
            channels: channels.max(1) as usize,
            voices: Vec::new(),
            gain: GainRamp::constant(0.0),
        }));

        let shared = Arc::clone(&timeline);
        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                shared.lock().render(data);
            },
            |err| {
                tracing::error!(error = %err, "output stream error");
            },
            None,
        )?;

        Ok(Self {
            timeline,
            stream,
            sample_rate,
            channels,
        })
    }
}

impl AudioOutput for CpalOutput {
    fn current_time(&self) -> f64 {
        self.timeline.lock().now()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn resume(&mut self) -> PlaybackResult<()> {
        self.stream.play()?;
        Ok(())
    }

    fn schedule(&mut self, buffer: ScheduledBuffer, start_at: f64) -> PlaybackResult<()> {
        if buffer.sample_rate() != self.sample_rate || buffer.channels() != self.channels {
            return Err(PlaybackError::unsupported_format(
                format!("{} Hz x{}", self.sample_rate, self.channels),
                format!("{} Hz x{}", buffer.sample_rate(), buffer.channels()),
            ));
        }
        let mut timeline = self.timeline.lock();
        let start = timeline.frame_at(start_at);
        let end = start + buffer.frames() as u64;
        timeline.voices.push(Voice {
            start,
            end,
            samples: buffer.into_samples(),
        });
        Ok(())
    }

    fn set_gain(&mut self, gain: f32) {
        self.timeline.lock().gain = GainRamp::constant(gain);
    }

    fn ramp_gain(&mut self, target: f32, seconds: f64) {
        let mut timeline = self.timeline.lock();
        let now = timeline.now();
        timeline.gain = timeline.gain.towards(now, target, seconds);
    }

    fn cut_after(&mut self, at: f64) -> usize {
        let mut timeline = self.timeline.lock();
        let at = timeline.frame_at(at);
        let mut affected = 0;
        for voice in timeline.voices.iter_mut().filter(|v| v.end > at) {
            voice.end = voice.start.max(at);
            affected += 1;
        }
        timeline.voices.retain(|v| v.end > v.start);
        affected
    }
}
