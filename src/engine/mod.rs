//! The engine: one owner for playback, sync, and the session.
//!
//! Every state change happens inside [`Engine::handle`] (a user command) or
//! [`Engine::tick`] (queued session events, due timers, closed throttle
//! windows). The host calls `tick` regularly; the
//! [`EngineDriver`](driver::EngineDriver) does so on a tokio interval.

mod builder;
mod command;
#[cfg(feature = "streaming")]
pub mod driver;

#[cfg(test)]
mod tests;

pub use builder::EngineBuilder;
pub use command::EngineCommand;
#[cfg(feature = "streaming")]
pub use driver::{EngineDriver, EngineHandle};

use crate::clock::{Clock, Timer};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::events::{EngineEvent, EventSink, Notice, NoticeKind};
use crate::playback::{AudioOutput, PlaybackController, PlaybackState};
use crate::session::{
    ConnectionStatus, Inbound, Session, SessionConnector, SessionError, SessionLifecycle,
};
use crate::streaming::AudioChunk;
use crate::sync::{ConfigSync, GenerationConfig, Prompt, PromptSync, WeightedPrompt};
use std::sync::Arc;
use std::time::Duration;

/// A streaming music engine over a session connector `C` and output `O`.
pub struct Engine<C: SessionConnector, O: AudioOutput> {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    controller: PlaybackController<O>,
    session: SessionLifecycle<C>,
    prompts: PromptSync,
    generation: ConfigSync,
    rearm: Timer,
    rejections: u64,
    events: EventSink,
}

impl<C: SessionConnector, O: AudioOutput> Engine<C, O> {
    pub fn builder(connector: C, output: O) -> EngineBuilder<C, O> {
        EngineBuilder::new(connector, output)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> PlaybackState {
        self.controller.state()
    }

    pub fn prompts(&self) -> &[Prompt] {
        self.prompts.prompts()
    }

    /// The prompts the next push would carry.
    pub fn weighted_prompts(&self) -> Vec<WeightedPrompt> {
        self.prompts.weighted_prompts()
    }

    pub fn generation_config(&self) -> &GenerationConfig {
        self.generation.config()
    }

    pub fn config_sync(&self) -> &ConfigSync {
        &self.generation
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.session.status()
    }

    /// Whether the session failed and the next play must reconnect.
    pub fn is_session_broken(&self) -> bool {
        self.session.is_broken()
    }

    pub fn next_start_time(&self) -> Option<f64> {
        self.controller.next_start_time()
    }

    pub fn controller(&self) -> &PlaybackController<O> {
        &self.controller
    }

    pub fn connector(&self) -> &C {
        self.session.connector()
    }

    pub fn connector_mut(&mut self) -> &mut C {
        self.session.connector_mut()
    }

    /// Whether the automatic replay after a reset is pending.
    pub fn is_rearm_pending(&self) -> bool {
        self.rearm.is_armed()
    }

    /// Earliest pending deadline, for hosts that sleep between ticks.
    pub fn next_deadline(&self) -> Option<Duration> {
        [
            self.controller.prime_deadline(self.now()),
            self.rearm.deadline(),
            self.prompts.deadline(),
            self.generation.deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Apply one user command.
    pub fn handle(&mut self, command: EngineCommand) -> EngineResult<()> {
        tracing::debug!(
            ?command,
            transport = command.is_transport(),
            state = %self.state(),
            "command"
        );
        let now = self.now();
        match command {
            EngineCommand::PlayPause => match self.state() {
                PlaybackState::Playing => self.pause(),
                PlaybackState::Paused | PlaybackState::Stopped => self.play()?,
                PlaybackState::Loading => self.stop(),
            },
            EngineCommand::Play => self.play()?,
            EngineCommand::Pause => self.pause(),
            EngineCommand::Stop => self.stop(),
            EngineCommand::Reset => self.reset()?,
            EngineCommand::SetPrompts(prompts) => {
                self.prompts.set_prompts(prompts, now);
                self.weights_changed();
            }
            EngineCommand::SetPromptWeight { id, weight } => {
                if self.prompts.set_weight(&id, weight, now) {
                    self.weights_changed();
                } else {
                    tracing::debug!(%id, "weight change for unknown prompt");
                }
            }
            EngineCommand::EditPrompt(prompt) => {
                let id = prompt.id.clone();
                if self.prompts.edit(prompt, now) {
                    self.weights_changed();
                } else {
                    tracing::debug!(%id, "edit for unknown prompt");
                }
            }
            EngineCommand::EditConfig(edit) => self.generation.edit(edit, now),
            EngineCommand::SetConfig(config) => self.generation.set_config(config, now),
        }
        Ok(())
    }

    /// Drain queued session events, then fire due timers and throttles.
    pub fn tick(&mut self) {
        while let Some(inbound) = self.session.poll() {
            self.on_inbound(inbound);
        }

        self.controller.poll();
        let now = self.now();

        if self.rearm.fire(now) {
            if self.state().can_play() {
                if let Err(e) = self.play() {
                    tracing::warn!(error = %e, "replay after reset failed");
                }
            } else {
                tracing::debug!(state = %self.state(), "reset replay no longer wanted");
            }
        }

        if let Some(prompts) = self.prompts.due(now) {
            self.dispatch_prompts(&prompts);
        }
        if let Some(config) = self.generation.due(now) {
            self.dispatch_config(&config);
        }
    }

    /// Start playback, reconnecting first if the session is unusable.
    pub fn play(&mut self) -> EngineResult<()> {
        if !self.state().can_play() {
            return Ok(());
        }
        self.rearm.cancel();
        let rejections = self.rejections;
        if self.session.needs_connect() {
            self.reconnect()?;
        }
        if self.rejections != rejections {
            // The re-sent prompts or config were refused; stay paused.
            return Ok(());
        }
        self.control("play", |s| s.play());
        if self.session.is_broken() {
            return Ok(());
        }
        self.controller.play()?;
        Ok(())
    }

    /// Fade out and pause. Only acts while loading or playing.
    pub fn pause(&mut self) {
        self.rearm.cancel();
        if self.controller.pause() {
            self.control("pause", |s| s.pause());
        }
    }

    /// Silence immediately and stop.
    pub fn stop(&mut self) {
        self.rearm.cancel();
        self.controller.stop();
        self.control("stop", |s| s.stop());
    }

    /// Drop the generation context, restore default settings, and replay
    /// once the server had time to discard the old context.
    pub fn reset(&mut self) -> EngineResult<()> {
        let rejections = self.rejections;
        if self.session.needs_connect() {
            self.reconnect()?;
        }
        if self.state().accepts_audio() {
            self.pause();
        }
        self.control("reset_context", |s| s.reset_context());
        self.generation.reset_to_defaults();
        self.flush_sync();
        if self.session.is_broken() || self.rejections != rejections {
            return Ok(());
        }
        let now = self.now();
        self.rearm.arm(now, self.config.reset_rearm);
        tracing::debug!(delay = ?self.config.reset_rearm, "replay armed after reset");
        Ok(())
    }

    /// Open a fresh session and re-send everything the user set.
    fn reconnect(&mut self) -> EngineResult<()> {
        tracing::info!(
            model = %self.config.model,
            broken = self.session.is_broken(),
            "connecting session"
        );
        if let Err(e) = self.session.connect() {
            self.connection_lost(e.to_string());
            return Err(e.into());
        }
        self.controller.restart_stream();
        self.prompts.clear_filtered();
        self.flush_sync();
        Ok(())
    }

    /// Push prompts and config right away, dropping any open window.
    fn flush_sync(&mut self) {
        let prompts = self.prompts.flush();
        self.dispatch_prompts(&prompts);
        let config = self.generation.flush();
        self.dispatch_config(&config);
    }

    fn dispatch_prompts(&mut self, prompts: &[WeightedPrompt]) {
        let result = self
            .session
            .with_session(|s| s.set_weighted_prompts(prompts));
        if self.after_dispatch("prompts", result) {
            tracing::debug!(count = prompts.len(), "weighted prompts sent");
        }
    }

    fn dispatch_config(&mut self, config: &GenerationConfig) {
        let result = self
            .session
            .with_session(|s| s.set_music_generation_config(config));
        if self.after_dispatch("config", result) {
            tracing::debug!(?config, "generation config sent");
        }
    }

    /// Classify a prompt or config push. Returns whether it was sent.
    fn after_dispatch(&mut self, what: &'static str, result: Result<(), SessionError>) -> bool {
        match result {
            Ok(()) => true,
            Err(SessionError::NotConnected) => {
                tracing::trace!(what, "no session; push skipped");
                false
            }
            Err(e) if e.is_connection_loss() => {
                self.connection_lost(e.to_string());
                false
            }
            Err(e) => {
                self.dispatch_rejected(what, e);
                false
            }
        }
    }

    /// Fire-and-forget a control verb.
    fn control(
        &mut self,
        verb: &'static str,
        f: impl FnOnce(&mut C::Session) -> Result<(), SessionError>,
    ) {
        match self.session.with_session(f) {
            Ok(()) => tracing::trace!(verb, "control sent"),
            Err(SessionError::NotConnected) => {}
            Err(e) if e.is_connection_loss() => self.connection_lost(e.to_string()),
            Err(e) => tracing::warn!(verb, error = %e, "control verb failed"),
        }
    }

    fn dispatch_rejected(&mut self, what: &'static str, error: SessionError) {
        tracing::warn!(what, error = %error, "dispatch rejected");
        self.rejections += 1;
        self.events
            .notice(Notice::new(NoticeKind::DispatchRejected, error.to_string()));
        self.rearm.cancel();
        self.controller.force_pause();
        self.control("pause", |s| s.pause());
    }

    fn connection_lost(&mut self, details: String) {
        tracing::warn!(%details, "session lost");
        self.session.mark_broken();
        self.rearm.cancel();
        self.controller.stop();
        self.events.notice(Notice::connection_error());
    }

    fn weights_changed(&self) {
        self.events
            .emit(EngineEvent::WeightsChanged(self.prompts.prompts().to_vec()));
    }

    fn on_inbound(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::SetupComplete => {
                tracing::debug!("session ready");
            }
            Inbound::Filtered { text, reason } => {
                tracing::info!(%text, %reason, "prompt filtered");
                self.prompts.filter(text);
                self.events
                    .notice(Notice::new(NoticeKind::ModerationFilter, reason));
            }
            Inbound::Audio(chunk) => self.on_chunk(&chunk),
            Inbound::Lost(e) => self.connection_lost(e.to_string()),
        }
    }

    fn on_chunk(&mut self, chunk: &AudioChunk) {
        if let Err(e) = self.controller.on_chunk(chunk) {
            if e.is_recoverable() {
                tracing::warn!(sequence = chunk.sequence, error = %e, "dropping chunk");
            } else {
                tracing::error!(error = %e, "audio output failed");
                self.stop();
            }
        }
    }
}

impl<C: SessionConnector, O: AudioOutput> std::fmt::Debug for Engine<C, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state())
            .field("session", &self.session)
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}
