//! Playback state transitions driven through the engine.

use super::*;
use approx_eq::assert_approx_eq;

#[test]
fn test_initial_state_is_stopped() {
    let h = harness();
    assert_eq!(h.engine.state(), PlaybackState::Stopped);
    assert_eq!(h.engine.next_start_time(), None);
    assert!(h.calls().is_empty());
}

#[test]
fn test_first_play_connects_and_syncs_before_playing() {
    let mut h = harness();
    h.send(EngineCommand::Play);

    let calls = h.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[0], Call::Connect);
    assert!(matches!(&calls[1], Call::Prompts(p) if p.len() == 2));
    assert_eq!(calls[2], Call::Config(GenerationConfig::defaults()));
    assert_eq!(calls[3], Call::Play);
    assert_eq!(h.engine.state(), PlaybackState::Loading);
    assert_eq!(h.engine.controller().output().resumes(), 1);
}

#[test]
fn test_lookahead_scenario() {
    let mut h = harness();
    h.send(EngineCommand::Play);
    for _ in 0..3 {
        h.chunk(1.0);
    }
    assert_eq!(h.start_times(), vec![2.0, 3.0, 4.0]);

    h.advance(1_990);
    assert_eq!(h.engine.state(), PlaybackState::Loading);
    h.advance(10);
    assert_eq!(h.engine.state(), PlaybackState::Playing);
    assert_eq!(
        h.states(),
        vec![PlaybackState::Loading, PlaybackState::Playing]
    );
}

#[test]
fn test_late_chunk_returns_to_loading() {
    let mut h = harness();
    h.play_until_playing(2);

    h.advance(2_600);
    h.chunk(1.0);

    assert_eq!(h.engine.state(), PlaybackState::Loading);
    assert_eq!(h.engine.next_start_time(), None);
    assert_eq!(h.start_times(), vec![2.0, 3.0]);

    // The next chunk re-primes a full look-ahead window.
    h.chunk(1.0);
    let starts = h.start_times();
    assert_eq!(starts.len(), 3);
    assert_approx_eq!(starts[2], 6.6, 1e-9);
    h.advance(2_000);
    assert_eq!(h.engine.state(), PlaybackState::Playing);
}

#[test]
fn test_toggle_while_loading_cancels() {
    let mut h = harness();
    h.send(EngineCommand::PlayPause);
    h.chunk(1.0);
    assert_eq!(h.engine.state(), PlaybackState::Loading);

    h.send(EngineCommand::PlayPause);
    assert_eq!(h.engine.state(), PlaybackState::Stopped);
    assert!(!h.engine.controller().is_priming());
    assert_eq!(h.calls().last(), Some(&Call::Stop));

    h.advance(3_000);
    assert_eq!(h.engine.state(), PlaybackState::Stopped);
    assert!(!h.engine.controller().output().is_audible_at(2.5));
}

#[test]
fn test_toggle_pauses_and_resumes_without_reconnect() {
    let mut h = harness();
    h.play_until_playing(3);
    h.take_calls();

    h.send(EngineCommand::PlayPause);
    assert_eq!(h.engine.state(), PlaybackState::Paused);
    assert_eq!(h.engine.next_start_time(), None);

    h.send(EngineCommand::PlayPause);
    assert_eq!(h.engine.state(), PlaybackState::Loading);
    assert_eq!(h.take_calls(), vec![Call::Pause, Call::Play]);
}

#[test]
fn test_pause_fades_out_and_cuts_pending_audio() {
    let mut h = harness();
    h.play_until_playing(3);
    h.send(EngineCommand::Pause);

    let out = h.engine.controller().output();
    assert!(out.is_audible_at(2.05));
    assert!(!out.is_audible_at(2.1));
    assert!(!out.is_audible_at(3.5));
}

#[test]
fn test_stale_timer_scenario() {
    let mut h = harness();
    h.send(EngineCommand::Play);
    h.chunk(1.0);
    h.send(EngineCommand::Pause);

    h.advance(5_000);
    assert_eq!(h.engine.state(), PlaybackState::Paused);
    assert_eq!(
        h.states(),
        vec![PlaybackState::Loading, PlaybackState::Paused]
    );
    let out = h.engine.controller().output();
    assert!((0..60).all(|i| !out.is_audible_at(i as f64 * 0.1)));
}

#[test]
fn test_chunks_while_paused_are_discarded() {
    let mut h = harness();
    h.play_until_playing(1);
    h.send(EngineCommand::Pause);

    h.chunk(1.0);
    h.chunk(1.0);
    assert_eq!(h.start_times().len(), 1);
    assert_eq!(h.engine.next_start_time(), None);
    assert_eq!(h.engine.controller().chunk_stats().discarded, 2);
}

#[test]
fn test_next_start_time_monotonic_while_playing() {
    let mut h = harness();
    h.play_until_playing(2);

    let mut last = h.engine.next_start_time().unwrap();
    for _ in 0..20 {
        h.advance(400);
        h.chunk(0.5);
        assert_eq!(h.engine.state(), PlaybackState::Playing);
        let next = h.engine.next_start_time().unwrap();
        assert!(next >= last);
        last = next;
    }
}

#[test]
fn test_stop_from_every_state() {
    for setup in 0..4 {
        let mut h = harness();
        match setup {
            0 => {}
            1 => h.send(EngineCommand::Play),
            2 => h.play_until_playing(3),
            _ => {
                h.play_until_playing(3);
                h.send(EngineCommand::Pause);
            }
        }
        h.send(EngineCommand::Stop);
        assert_eq!(h.engine.state(), PlaybackState::Stopped);
        assert_eq!(h.engine.next_start_time(), None);
    }
}

/// Small deterministic generator so the walk is reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

#[test]
fn test_state_graph_is_closed_under_random_walks() {
    for seed in 1..=8 {
        let mut h = harness();
        let mut rng = Lcg(seed);
        for _ in 0..200 {
            match rng.next() % 9 {
                0 => h.send(EngineCommand::PlayPause),
                1 => h.send(EngineCommand::Play),
                2 => h.send(EngineCommand::Pause),
                3 => h.send(EngineCommand::Stop),
                4 | 5 => {
                    if !h.engine.is_session_broken() && !h.engine.connector().senders.is_empty() {
                        h.chunk(0.5);
                    }
                }
                6 => h.advance(rng.next() % 3_000),
                7 => {
                    if let Some(server) = h.engine.connector().senders.last() {
                        server.on_error("transport reset");
                    }
                    h.engine.tick();
                }
                _ => h.send(EngineCommand::SetPromptWeight {
                    id: "p0".into(),
                    weight: (rng.next() % 200) as f32 / 100.0,
                }),
            }
            let state = h.engine.state();
            if matches!(state, PlaybackState::Stopped | PlaybackState::Paused) {
                assert_eq!(h.engine.next_start_time(), None);
                assert!(!h.engine.controller().is_priming());
            }
        }

        let mut previous = PlaybackState::Stopped;
        for state in h.states() {
            assert_ne!(state, previous);
            match state {
                PlaybackState::Playing => assert_eq!(previous, PlaybackState::Loading),
                PlaybackState::Loading => assert_ne!(previous, PlaybackState::Loading),
                PlaybackState::Paused | PlaybackState::Stopped => {}
            }
            previous = state;
        }
    }
}

#[test]
fn test_builder_rejects_mismatched_output() {
    let clock = ManualClock::new();
    let output = VirtualOutput::new(Arc::new(clock.clone()), 44_100, 2);
    let err = Engine::builder(MockConnector::default(), output)
        .clock(Arc::new(clock))
        .build()
        .unwrap_err();
    assert!(matches!(err, crate::error::EngineError::InvalidConfig(_)));
}
