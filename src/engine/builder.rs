//! Assembling an [`Engine`].

use super::Engine;
use crate::clock::{Clock, SystemClock, Timer};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::events::{EngineEvent, EventSink};
use crate::playback::{AudioOutput, ClockScheduler, PlaybackController};
use crate::session::{SessionConnector, SessionLifecycle};
use crate::streaming::{AudioDecoder, ChunkScheduler, Pcm16Decoder};
use crate::sync::{ConfigSync, Prompt, PromptSync};
use crossbeam::channel::Receiver;
use std::sync::Arc;

/// Builder for [`Engine`].
///
/// Defaults: [`EngineConfig::default`], a [`SystemClock`], the
/// [`Pcm16Decoder`], and an empty prompt list.
pub struct EngineBuilder<C, O> {
    connector: C,
    output: O,
    config: EngineConfig,
    clock: Option<Arc<dyn Clock>>,
    decoder: Option<Box<dyn AudioDecoder>>,
    prompts: Vec<Prompt>,
}

impl<C: SessionConnector, O: AudioOutput> EngineBuilder<C, O> {
    pub(crate) fn new(connector: C, output: O) -> Self {
        Self {
            connector,
            output,
            config: EngineConfig::default(),
            clock: None,
            decoder: None,
            prompts: Vec::new(),
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Time source for timers and throttles.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn decoder(mut self, decoder: Box<dyn AudioDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Initial prompt list. Not pushed until the first connect.
    pub fn prompts(mut self, prompts: Vec<Prompt>) -> Self {
        self.prompts = prompts;
        self
    }

    /// Validate the configuration and build the engine together with the
    /// receiver for its events.
    pub fn build(self) -> EngineResult<(Engine<C, O>, Receiver<EngineEvent>)> {
        self.config.validate()?;
        let config = self.config;
        if self.output.sample_rate() != config.sample_rate
            || self.output.channels() != config.channels
        {
            return Err(EngineError::invalid_config(format!(
                "output runs at {} Hz x{}, config expects {} Hz x{}",
                self.output.sample_rate(),
                self.output.channels(),
                config.sample_rate,
                config.channels
            )));
        }
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()) as Arc<dyn Clock>);
        let decoder = self
            .decoder
            .unwrap_or_else(|| Box::new(Pcm16Decoder::new()) as Box<dyn AudioDecoder>);

        let (events, receiver) = EventSink::channel();
        let chunks = ChunkScheduler::new(decoder, config.lookahead).with_underrun_notice(
            config.underrun_notice_threshold,
            config.underrun_notice_window,
        );
        let controller = PlaybackController::new(
            ClockScheduler::new(self.output, config.gain_ramp),
            chunks,
            events.clone(),
        );

        let engine = Engine {
            session: SessionLifecycle::new(self.connector, config.model.clone()),
            generation: ConfigSync::new(config.throttle_window),
            prompts: PromptSync::with_prompts(config.throttle_window, self.prompts),
            controller,
            clock,
            rearm: Timer::new(),
            rejections: 0,
            events,
            config,
        };
        Ok((engine, receiver))
    }
}
