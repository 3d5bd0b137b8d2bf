//! The playback state machine.
//!
//! [`PlaybackController`] is the only writer of [`PlaybackState`]. It owns the
//! [`ClockScheduler`], the [`ChunkScheduler`] (and with it `nextStartTime`),
//! and the look-ahead deadline, so every transition can cancel what it
//! invalidates in one place.
//!
//! The look-ahead deadline is kept on the output clock, the same clock the
//! primed buffer is scheduled on, so `playing` is declared when that buffer
//! actually starts to sound.

use super::clock_scheduler::ClockScheduler;
use super::error::PlaybackResult;
use super::state::PlaybackState;
use super::traits::AudioOutput;
use crate::events::{EngineEvent, EventSink, Notice, NoticeKind};
use crate::streaming::{AudioChunk, ChunkOutcome, ChunkScheduler, ChunkStats, StreamResult};
use std::time::Duration;

/// Slack for float error between the scheduled start and the clock.
const PRIME_TOLERANCE: f64 = 1e-6;

/// Drives playback state, the output gain, and chunk scheduling.
pub struct PlaybackController<O> {
    state: PlaybackState,
    output: ClockScheduler<O>,
    chunks: ChunkScheduler,
    /// Output-clock time at which the primed buffer starts.
    prime_at: Option<f64>,
    events: EventSink,
}

impl<O: AudioOutput> PlaybackController<O> {
    pub fn new(output: ClockScheduler<O>, chunks: ChunkScheduler, events: EventSink) -> Self {
        Self {
            state: PlaybackState::Stopped,
            output,
            chunks,
            prime_at: None,
            events,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Start time of the next chunk, if a run is in progress.
    pub fn next_start_time(&self) -> Option<f64> {
        self.chunks.next_start_time()
    }

    /// Whether the look-ahead deadline is pending.
    pub fn is_priming(&self) -> bool {
        self.prime_at.is_some()
    }

    /// The look-ahead deadline translated onto a caller clock reading
    /// `now`, if pending.
    pub fn prime_deadline(&self, now: Duration) -> Option<Duration> {
        let remaining = self.prime_at? - self.output.now();
        Some(now + Duration::from_secs_f64(remaining.max(0.0)))
    }

    pub fn chunk_stats(&self) -> ChunkStats {
        self.chunks.stats()
    }

    pub fn clock_scheduler(&self) -> &ClockScheduler<O> {
        &self.output
    }

    pub fn output(&self) -> &O {
        self.output.output()
    }

    pub fn output_mut(&mut self) -> &mut O {
        self.output.output_mut()
    }

    fn set_state(&mut self, new: PlaybackState) {
        if self.state == new {
            return;
        }
        tracing::debug!(old = ?self.state, new = ?new, "playback state");
        self.state = new;
        self.events.emit(EngineEvent::StateChanged(new));
    }

    /// Forget the current run: cancel the prime and unset `nextStartTime`.
    fn reset_clock(&mut self) {
        self.prime_at = None;
        self.chunks.reset();
    }

    /// User play: `stopped | paused -> loading`.
    ///
    /// Resumes the output and fades the gain in. Returns `false` without side
    /// effects from any other state.
    pub fn play(&mut self) -> PlaybackResult<bool> {
        if !self.state.can_play() {
            return Ok(false);
        }
        self.reset_clock();
        self.output.fade_in()?;
        self.set_state(PlaybackState::Loading);
        Ok(true)
    }

    /// User pause: `playing | loading -> paused`.
    ///
    /// Fades out, cuts everything that would sound after the fade, and
    /// forgets the run. Returns `false` from any other state.
    pub fn pause(&mut self) -> bool {
        if !self.state.accepts_audio() {
            return false;
        }
        self.enter_paused();
        true
    }

    /// Pause from whatever state holds. Used when a dispatch is rejected.
    pub fn force_pause(&mut self) {
        self.enter_paused();
    }

    fn enter_paused(&mut self) {
        self.output.fade_out();
        self.reset_clock();
        self.set_state(PlaybackState::Paused);
    }

    /// `any -> stopped`: silence immediately and forget the run.
    pub fn stop(&mut self) {
        self.output.silence();
        self.reset_clock();
        self.set_state(PlaybackState::Stopped);
    }

    /// A new stream is starting; drop decoder state from the old one.
    pub fn restart_stream(&mut self) {
        self.prime_at = None;
        self.chunks.restart_stream();
    }

    /// Handle one chunk from the session.
    pub fn on_chunk(&mut self, chunk: &AudioChunk) -> StreamResult<ChunkOutcome> {
        if !self.state.accepts_audio() {
            return Ok(self.chunks.discard(chunk, &self.output));
        }

        let outcome = self.chunks.schedule(chunk, &mut self.output)?;
        match outcome {
            ChunkOutcome::Primed { start_at } => {
                if self.state == PlaybackState::Loading {
                    tracing::debug!(start_at, "look-ahead primed");
                    self.prime_at = Some(start_at);
                }
            }
            ChunkOutcome::Underrun { recurring, .. } => {
                self.prime_at = None;
                self.set_state(PlaybackState::Loading);
                if recurring {
                    self.events.notice(Notice::new(
                        NoticeKind::RecurringUnderrun,
                        "Playback keeps stalling; the connection may be too slow.",
                    ));
                }
            }
            ChunkOutcome::Scheduled { .. } | ChunkOutcome::Discarded => {}
        }
        Ok(outcome)
    }

    /// Fire the look-ahead deadline once the output clock reaches it. Moves
    /// `loading -> playing` only if still loading when it fires.
    pub fn poll(&mut self) -> bool {
        match self.prime_at {
            Some(at) if self.output.now() >= at - PRIME_TOLERANCE => self.prime_at = None,
            _ => return false,
        }
        if self.state != PlaybackState::Loading {
            tracing::debug!(state = ?self.state, "ignoring stale look-ahead deadline");
            return false;
        }
        self.set_state(PlaybackState::Playing);
        true
    }
}

impl<O> std::fmt::Debug for PlaybackController<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("state", &self.state)
            .field("chunks", &self.chunks)
            .field("prime_at", &self.prime_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::playback::VirtualOutput;
    use crate::streaming::Pcm16Decoder;
    use crossbeam::channel::Receiver;
    use std::sync::Arc;

    fn controller(clock: &ManualClock) -> (PlaybackController<VirtualOutput>, Receiver<EngineEvent>) {
        let (events, rx) = EventSink::channel();
        let output = ClockScheduler::new(
            VirtualOutput::new(Arc::new(clock.clone()), 48_000, 2),
            Duration::from_millis(100),
        );
        let chunks = ChunkScheduler::new(Box::new(Pcm16Decoder::new()), Duration::from_secs(2));
        (PlaybackController::new(output, chunks, events), rx)
    }

    fn one_second() -> AudioChunk {
        AudioChunk::new(vec![0; 48_000 * 2 * 2], 48_000, 2)
    }

    fn states(rx: &Receiver<EngineEvent>) -> Vec<PlaybackState> {
        rx.try_iter()
            .filter_map(|e| match e {
                EngineEvent::StateChanged(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn play_from_stopped_enters_loading() {
        let clock = ManualClock::new();
        let (mut ctl, rx) = controller(&clock);
        assert!(ctl.play().unwrap());
        assert_eq!(ctl.state(), PlaybackState::Loading);
        assert_eq!(states(&rx), vec![PlaybackState::Loading]);
        assert!(!ctl.play().unwrap());
    }

    #[test]
    fn chunks_while_stopped_are_discarded() {
        let clock = ManualClock::new();
        let (mut ctl, _rx) = controller(&clock);
        let outcome = ctl.on_chunk(&one_second()).unwrap();
        assert_eq!(outcome, ChunkOutcome::Discarded);
        assert!(ctl.output().voices().is_empty());
        assert_eq!(ctl.next_start_time(), None);
    }

    #[test]
    fn stop_cancels_prime_and_unsets_clock() {
        let clock = ManualClock::new();
        let (mut ctl, _rx) = controller(&clock);
        ctl.play().unwrap();
        ctl.on_chunk(&one_second()).unwrap();
        assert!(ctl.is_priming());

        ctl.stop();
        assert_eq!(ctl.state(), PlaybackState::Stopped);
        assert!(!ctl.is_priming());
        assert_eq!(ctl.next_start_time(), None);
        assert!(!ctl.output().is_audible_at(2.5));
    }

    #[test]
    fn prime_follows_the_output_clock() {
        let engine_clock = ManualClock::new();
        let device_clock = ManualClock::new();
        let (mut ctl, rx) = controller(&device_clock);
        ctl.play().unwrap();
        ctl.on_chunk(&one_second()).unwrap();
        assert_eq!(
            ctl.prime_deadline(engine_clock.now()),
            Some(engine_clock.now() + Duration::from_secs(2))
        );

        // The engine clock running ahead does not start playback early.
        engine_clock.advance(Duration::from_secs(5));
        assert!(!ctl.poll());
        assert_eq!(ctl.state(), PlaybackState::Loading);

        device_clock.advance(Duration::from_millis(1500));
        assert_eq!(
            ctl.prime_deadline(engine_clock.now()),
            Some(engine_clock.now() + Duration::from_millis(500))
        );
        assert!(!ctl.poll());

        device_clock.advance(Duration::from_millis(500));
        assert!(ctl.poll());
        assert_eq!(ctl.state(), PlaybackState::Playing);
        assert!(!ctl.is_priming());
        assert_eq!(
            states(&rx),
            vec![PlaybackState::Loading, PlaybackState::Playing]
        );
    }

    #[test]
    fn force_pause_from_stopped() {
        let clock = ManualClock::new();
        let (mut ctl, _rx) = controller(&clock);
        ctl.force_pause();
        assert_eq!(ctl.state(), PlaybackState::Paused);
        assert!(!ctl.pause());
    }

    #[test]
    fn recurring_underruns_raise_one_notice() {
        let clock = ManualClock::new();
        let (mut ctl, rx) = controller(&clock);
        ctl.play().unwrap();

        for _ in 0..3 {
            ctl.on_chunk(&one_second()).unwrap();
            clock.advance(Duration::from_secs(2));
            ctl.poll();
            clock.advance(Duration::from_millis(1500));
            let outcome = ctl.on_chunk(&one_second()).unwrap();
            assert!(matches!(outcome, ChunkOutcome::Underrun { .. }));
        }

        let notices: Vec<_> = rx
            .try_iter()
            .filter(|e| matches!(e, EngineEvent::Notice(_)))
            .collect();
        assert_eq!(notices.len(), 1);
        assert_eq!(ctl.chunk_stats().underruns, 3);
    }
}
