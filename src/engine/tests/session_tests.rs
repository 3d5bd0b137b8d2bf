//! Connection loss, reconnects, and server notices.

use super::*;
use crate::events::CONNECTION_ERROR_MESSAGE;
use crate::session::ConnectionStatus;

#[test]
fn test_setup_complete_marks_session_ready() {
    let mut h = harness();
    h.send(EngineCommand::Play);
    assert_eq!(h.engine.connection_status(), ConnectionStatus::AwaitingSetup);

    h.server().on_message(ServerMessage::SetupComplete);
    h.engine.tick();
    assert_eq!(h.engine.connection_status(), ConnectionStatus::Ready);
}

#[test]
fn test_connection_error_stops_and_notifies() {
    let mut h = harness();
    h.play_until_playing(3);

    h.server().on_error("socket reset");
    h.engine.tick();

    assert_eq!(h.engine.state(), PlaybackState::Stopped);
    assert!(h.engine.is_session_broken());
    assert_eq!(h.engine.next_start_time(), None);
    assert!(!h.engine.controller().output().is_audible_at(3.0));

    let notices = h.notices_of(NoticeKind::ConnectionError);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, CONNECTION_ERROR_MESSAGE);
}

#[test]
fn test_close_is_a_connection_error() {
    let mut h = harness();
    h.send(EngineCommand::Play);
    h.server().on_close();
    h.engine.tick();
    assert_eq!(h.engine.state(), PlaybackState::Stopped);
    assert_eq!(h.notices_of(NoticeKind::ConnectionError).len(), 1);
}

#[test]
fn test_reconnect_law() {
    let mut h = harness();
    h.send(EngineCommand::SetPromptWeight {
        id: "p1".into(),
        weight: 1.5,
    });
    h.send(EngineCommand::EditConfig(crate::sync::ConfigEdit::Bpm(Some(96))));
    h.play_until_playing(3);

    h.server().on_error("socket reset");
    h.engine.tick();
    h.take_calls();

    let expected_prompts = h.engine.weighted_prompts();
    let expected_config = h.engine.generation_config().clone();
    assert_eq!(expected_prompts.len(), 3);
    assert_eq!(expected_config.bpm, Some(96));

    h.send(EngineCommand::PlayPause);
    assert_eq!(
        h.take_calls(),
        vec![
            Call::Connect,
            Call::Prompts(expected_prompts),
            Call::Config(expected_config),
            Call::Play,
        ]
    );
    assert_eq!(h.engine.state(), PlaybackState::Loading);
    assert_eq!(h.start_times().len(), 3);

    h.chunk(1.0);
    assert_eq!(h.start_times().len(), 4);
}

#[test]
fn test_dead_session_events_never_reach_the_engine() {
    let mut h = harness();
    h.play_until_playing(3);
    let old = h.first_server();
    old.on_close();
    h.engine.tick();

    h.send(EngineCommand::Play);
    assert_eq!(h.engine.connector().senders.len(), 2);

    assert!(!old.on_message(ServerMessage::FilteredPrompt {
        text: "Bossa Nova".into(),
        reason: "late".into()
    }));
    assert!(!old.on_error("late error"));
    h.engine.tick();
    assert_eq!(h.engine.state(), PlaybackState::Loading);
    assert!(h.notices_of(NoticeKind::ModerationFilter).is_empty());
}

#[test]
fn test_filtered_prompt_is_excluded_and_playback_continues() {
    let mut h = harness();
    h.play_until_playing(3);
    h.take_calls();

    h.server().on_message(ServerMessage::FilteredPrompt {
        text: "Drum and Bass".into(),
        reason: "Prompt was filtered".into(),
    });
    h.engine.tick();

    assert_eq!(h.engine.state(), PlaybackState::Playing);
    let notices = h.notices_of(NoticeKind::ModerationFilter);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, "Prompt was filtered");

    h.send(EngineCommand::SetPromptWeight {
        id: "p2".into(),
        weight: 2.0,
    });
    h.advance(200);
    let calls = h.take_calls();
    let Some(Call::Prompts(sent)) = calls.last() else {
        panic!("expected a prompt push, got {calls:?}");
    };
    assert!(sent.iter().all(|p| p.text != "Drum and Bass"));
}

#[test]
fn test_reconnect_clears_filtered_texts() {
    let mut h = harness();
    h.play_until_playing(1);
    h.server().on_message(ServerMessage::FilteredPrompt {
        text: "Drum and Bass".into(),
        reason: "filtered".into(),
    });
    h.engine.tick();
    assert_eq!(h.engine.weighted_prompts().len(), 1);

    h.server().on_close();
    h.engine.tick();
    h.send(EngineCommand::Play);
    assert_eq!(h.engine.weighted_prompts().len(), 2);
}

#[test]
fn test_failed_connect_stays_stopped() {
    let mut h = harness();
    h.refuse_connects(true);

    assert!(h.engine.handle(EngineCommand::Play).is_err());
    assert_eq!(h.engine.state(), PlaybackState::Stopped);
    assert!(h.engine.is_session_broken());
    assert_eq!(h.notices_of(NoticeKind::ConnectionError).len(), 1);

    h.refuse_connects(false);
    h.send(EngineCommand::Play);
    assert_eq!(h.engine.state(), PlaybackState::Loading);
}

#[test]
fn test_chunks_after_connection_loss_are_ignored() {
    let mut h = harness();
    h.play_until_playing(1);
    let server = h.server();
    server.on_error("gone");
    h.engine.tick();

    let delivered = server.on_message(ServerMessage::AudioChunk {
        data: vec![0; 4],
        sample_rate: 48_000,
        channels: 2,
    });
    assert!(!delivered);
    h.engine.tick();
    assert_eq!(h.start_times().len(), 1);
    assert_eq!(h.engine.state(), PlaybackState::Stopped);
}
