//! Running an [`Engine`] on a tokio event loop.
//!
//! Commands arrive over an unbounded channel and are applied in order; an
//! interval ticks the engine between them. The engine never leaves the
//! driver's task, so it needs no locking.

use super::{Engine, EngineCommand};
use crate::error::{EngineError, EngineResult};
use crate::playback::AudioOutput;
use crate::session::SessionConnector;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

/// Cloneable handle for sending commands to a running driver.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: UnboundedSender<EngineCommand>,
    cancel: CancellationToken,
}

impl EngineHandle {
    /// Queue a command. Fails once the driver has stopped.
    pub fn send(&self, command: EngineCommand) -> EngineResult<()> {
        self.tx.send(command).map_err(|_| EngineError::Shutdown)
    }

    /// Ask the driver to stop after the current step.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Owns an engine and feeds it commands and ticks.
pub struct EngineDriver<C: SessionConnector, O: AudioOutput> {
    engine: Engine<C, O>,
    commands: UnboundedReceiver<EngineCommand>,
    cancel: CancellationToken,
    tick: Duration,
}

impl<C: SessionConnector, O: AudioOutput> EngineDriver<C, O> {
    /// Wrap `engine`; ticks at the configured interval.
    pub fn new(engine: Engine<C, O>) -> (Self, EngineHandle) {
        let (tx, commands) = unbounded_channel();
        let cancel = CancellationToken::new();
        let tick = engine.config().tick_interval;
        let driver = Self {
            engine,
            commands,
            cancel: cancel.clone(),
            tick,
        };
        (driver, EngineHandle { tx, cancel })
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run until cancelled or every handle is dropped, then hand the engine
    /// back.
    pub async fn run(mut self) -> Engine<C, O> {
        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::debug!(tick = ?self.tick, "engine driver started");

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::debug!("engine driver cancelled");
                    break;
                }
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        tracing::debug!("all engine handles dropped");
                        break;
                    };
                    if let Err(e) = self.engine.handle(command) {
                        tracing::warn!(error = %e, "command failed");
                    }
                    self.engine.tick();
                }
                _ = ticker.tick() => self.engine.tick(),
            }
        }

        self.engine.stop();
        self.engine
    }
}
