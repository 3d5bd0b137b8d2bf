//! Engine tests against a recording session and a virtual output.

use super::{Engine, EngineCommand};
use crate::clock::ManualClock;
use crate::config::EngineConfig;
use crate::events::{EngineEvent, Notice, NoticeKind};
use crate::playback::{PlaybackState, VirtualOutput};
use crate::session::{
    ServerMessage, Session, SessionConnector, SessionError, SessionResult, SessionSender,
};
use crate::sync::{GenerationConfig, Prompt, WeightedPrompt};
use crossbeam::channel::Receiver;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

mod session_tests;
mod transition_tests;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Connect,
    Play,
    Pause,
    Stop,
    ResetContext,
    Prompts(Vec<WeightedPrompt>),
    Config(GenerationConfig),
}

/// Shared between the connector and every session it opens.
#[derive(Debug, Clone, Default)]
pub(crate) struct Log {
    calls: Arc<Mutex<Vec<Call>>>,
    reject_prompts: Arc<Mutex<Option<String>>>,
}

impl Log {
    fn push(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

pub(crate) struct MockSession {
    log: Log,
}

impl Session for MockSession {
    fn play(&mut self) -> SessionResult<()> {
        self.log.push(Call::Play);
        Ok(())
    }

    fn pause(&mut self) -> SessionResult<()> {
        self.log.push(Call::Pause);
        Ok(())
    }

    fn stop(&mut self) -> SessionResult<()> {
        self.log.push(Call::Stop);
        Ok(())
    }

    fn reset_context(&mut self) -> SessionResult<()> {
        self.log.push(Call::ResetContext);
        Ok(())
    }

    fn set_weighted_prompts(&mut self, prompts: &[WeightedPrompt]) -> SessionResult<()> {
        if let Some(reason) = self.log.reject_prompts.lock().clone() {
            return Err(SessionError::rejected(reason));
        }
        self.log.push(Call::Prompts(prompts.to_vec()));
        Ok(())
    }

    fn set_music_generation_config(&mut self, config: &GenerationConfig) -> SessionResult<()> {
        self.log.push(Call::Config(config.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct MockConnector {
    log: Log,
    senders: Vec<SessionSender>,
    refuse: bool,
}

impl SessionConnector for MockConnector {
    type Session = MockSession;

    fn connect(&mut self, model: &str, inbound: SessionSender) -> SessionResult<MockSession> {
        if self.refuse {
            return Err(SessionError::connect(model, "refused"));
        }
        self.log.push(Call::Connect);
        self.senders.push(inbound);
        Ok(MockSession {
            log: self.log.clone(),
        })
    }
}

pub(crate) struct Harness {
    pub engine: Engine<MockConnector, VirtualOutput>,
    pub clock: ManualClock,
    receiver: Receiver<EngineEvent>,
    events: Vec<EngineEvent>,
}

pub(crate) fn sample_prompts() -> Vec<Prompt> {
    vec![
        Prompt::new("p0", "Bossa Nova", 1.0, "#9900ff"),
        Prompt::new("p1", "Chillwave", 0.0, "#5200ff"),
        Prompt::new("p2", "Drum and Bass", 0.5, "#ff25f6"),
    ]
}

pub(crate) fn harness() -> Harness {
    let clock = ManualClock::new();
    let output = VirtualOutput::new(Arc::new(clock.clone()), 48_000, 2);
    let (engine, receiver) = Engine::builder(MockConnector::default(), output)
        .config(EngineConfig::default().with_model("models/test"))
        .clock(Arc::new(clock.clone()))
        .prompts(sample_prompts())
        .build()
        .unwrap();
    Harness {
        engine,
        clock,
        receiver,
        events: Vec::new(),
    }
}

impl Harness {
    pub fn send(&mut self, command: EngineCommand) {
        self.engine.handle(command).unwrap();
        self.engine.tick();
    }

    /// Step time forward in 10 ms ticks, as a driver would.
    pub fn advance(&mut self, ms: u64) {
        for _ in 0..ms / 10 {
            self.clock.advance(Duration::from_millis(10));
            self.engine.tick();
        }
        let rest = ms % 10;
        if rest > 0 {
            self.clock.advance(Duration::from_millis(rest));
            self.engine.tick();
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.engine.connector().log.calls.lock().clone()
    }

    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut *self.engine.connector().log.calls.lock())
    }

    pub fn reject_prompts(&self, reason: Option<&str>) {
        *self.engine.connector().log.reject_prompts.lock() = reason.map(str::to_string);
    }

    pub fn refuse_connects(&mut self, refuse: bool) {
        self.engine.connector_mut().refuse = refuse;
    }

    /// Inbound handlers of the most recent connection.
    pub fn server(&self) -> SessionSender {
        self.engine.connector().senders.last().cloned().unwrap()
    }

    pub fn first_server(&self) -> SessionSender {
        self.engine.connector().senders[0].clone()
    }

    /// Deliver `seconds` of stereo silence from the server and tick.
    pub fn chunk(&mut self, seconds: f64) {
        let frames = (48_000.0 * seconds) as usize;
        self.server().on_message(ServerMessage::AudioChunk {
            data: vec![0; frames * 4],
            sample_rate: 48_000,
            channels: 2,
        });
        self.engine.tick();
    }

    fn drain(&mut self) {
        self.events.extend(self.receiver.try_iter());
    }

    pub fn states(&mut self) -> Vec<PlaybackState> {
        self.drain();
        self.events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::StateChanged(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&mut self) -> Vec<Notice> {
        self.drain();
        self.events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::Notice(n) => Some(n.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn notices_of(&mut self, kind: NoticeKind) -> Vec<Notice> {
        self.notices().into_iter().filter(|n| n.kind == kind).collect()
    }

    pub fn start_times(&self) -> Vec<f64> {
        self.engine.controller().output().start_times()
    }

    /// Play and let the look-ahead fill with `chunks` one-second chunks.
    pub fn play_until_playing(&mut self, chunks: usize) {
        self.send(EngineCommand::Play);
        for _ in 0..chunks {
            self.chunk(1.0);
        }
        self.advance(2_000);
        assert_eq!(self.engine.state(), PlaybackState::Playing);
    }
}
