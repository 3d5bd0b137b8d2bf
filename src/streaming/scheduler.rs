//! Turns the ordered chunk stream into gapless scheduled playback.
//!
//! The first chunk after a (re)start is placed `lookahead` into the future so
//! a buffer of audio is queued before playback is declared started. Every
//! following chunk is placed exactly where the previous one ends. If the
//! slot for the next chunk has already passed on the output clock the queue
//! has run dry: the chunk is dropped and the caller must re-prime.

use super::chunk::AudioChunk;
use super::decoder::AudioDecoder;
use super::error::StreamResult;
use crate::playback::{AudioOutput, ClockScheduler};
use std::collections::VecDeque;
use std::time::Duration;

/// What happened to one chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChunkOutcome {
    /// Decoded and dropped because playback is not running.
    Discarded,
    /// First chunk of a run; scheduled `lookahead` ahead of the clock.
    Primed { start_at: f64 },
    /// Scheduled back to back with the previous chunk.
    Scheduled { start_at: f64 },
    /// The slot was `missed_by` seconds in the past; the buffer was dropped.
    Underrun { missed_by: f64, recurring: bool },
}

/// Counters kept by the [`ChunkScheduler`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkStats {
    pub scheduled: u64,
    pub discarded: u64,
    pub underruns: u64,
    pub decode_errors: u64,
}

/// Look-ahead scheduling and underrun detection for incoming chunks.
pub struct ChunkScheduler {
    decoder: Box<dyn AudioDecoder>,
    lookahead: Duration,
    next_start_time: Option<f64>,
    stats: ChunkStats,
    recent_underruns: VecDeque<f64>,
    underrun_threshold: usize,
    underrun_window: Duration,
}

impl ChunkScheduler {
    pub fn new(decoder: Box<dyn AudioDecoder>, lookahead: Duration) -> Self {
        Self {
            decoder,
            lookahead,
            next_start_time: None,
            stats: ChunkStats::default(),
            recent_underruns: VecDeque::new(),
            underrun_threshold: 3,
            underrun_window: Duration::from_secs(10),
        }
    }

    /// Report underruns as recurring once `threshold` of them land within
    /// `window` of each other.
    pub fn with_underrun_notice(mut self, threshold: usize, window: Duration) -> Self {
        self.underrun_threshold = threshold.max(1);
        self.underrun_window = window;
        self
    }

    /// Where the next chunk will start, if a run is in progress.
    pub fn next_start_time(&self) -> Option<f64> {
        self.next_start_time
    }

    pub fn lookahead(&self) -> Duration {
        self.lookahead
    }

    pub fn stats(&self) -> ChunkStats {
        self.stats
    }

    /// Forget the current run. The next chunk primes again.
    pub fn reset(&mut self) {
        self.next_start_time = None;
    }

    /// A new stream is starting: forget the current run and any decoder
    /// state carried over from the old stream.
    pub fn restart_stream(&mut self) {
        self.reset();
        self.decoder.restart();
    }

    /// Decode and drop a chunk that arrived while playback is not running.
    ///
    /// The decoder still sees every chunk in order, so stateful decoders stay
    /// in step with the stream.
    pub fn discard<O: AudioOutput>(
        &mut self,
        chunk: &AudioChunk,
        output: &ClockScheduler<O>,
    ) -> ChunkOutcome {
        if let Err(e) = self
            .decoder
            .decode(chunk, output.sample_rate(), output.channels())
        {
            self.stats.decode_errors += 1;
            tracing::debug!(sequence = chunk.sequence, error = %e, "discarded chunk failed to decode");
        }
        tracing::trace!(sequence = chunk.sequence, "discarding chunk");
        self.stats.discarded += 1;
        ChunkOutcome::Discarded
    }

    /// Decode `chunk` and place it on the output clock.
    pub fn schedule<O: AudioOutput>(
        &mut self,
        chunk: &AudioChunk,
        output: &mut ClockScheduler<O>,
    ) -> StreamResult<ChunkOutcome> {
        let buffer = self
            .decoder
            .decode(chunk, output.sample_rate(), output.channels())
            .inspect_err(|_| self.stats.decode_errors += 1)?;

        let now = output.now();
        let (start_at, primed) = match self.next_start_time {
            None => (now + self.lookahead.as_secs_f64(), true),
            Some(next) if next < now => {
                self.next_start_time = None;
                self.stats.underruns += 1;
                let recurring = self.record_underrun(now);
                tracing::warn!(
                    sequence = chunk.sequence,
                    missed_by = now - next,
                    recurring,
                    "buffer underrun"
                );
                return Ok(ChunkOutcome::Underrun {
                    missed_by: now - next,
                    recurring,
                });
            }
            Some(next) => (next, false),
        };

        let duration = buffer.duration();
        output.schedule(buffer, start_at)?;
        self.next_start_time = Some(start_at + duration);
        self.stats.scheduled += 1;
        tracing::trace!(sequence = chunk.sequence, start_at, duration, "scheduled chunk");

        Ok(if primed {
            ChunkOutcome::Primed { start_at }
        } else {
            ChunkOutcome::Scheduled { start_at }
        })
    }

    /// Remember an underrun at `now`; true exactly when this one crosses the
    /// threshold. The history is cleared then so a single burst yields a
    /// single notice.
    fn record_underrun(&mut self, now: f64) -> bool {
        let window = self.underrun_window.as_secs_f64();
        while self
            .recent_underruns
            .front()
            .is_some_and(|&t| now - t > window)
        {
            self.recent_underruns.pop_front();
        }
        self.recent_underruns.push_back(now);
        if self.recent_underruns.len() >= self.underrun_threshold {
            self.recent_underruns.clear();
            true
        } else {
            false
        }
    }
}

impl std::fmt::Debug for ChunkScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkScheduler")
            .field("lookahead", &self.lookahead)
            .field("next_start_time", &self.next_start_time)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
