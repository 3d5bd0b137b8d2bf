//! Monotonic time sources and cancelable deadlines.
//!
//! Everything in the engine that waits (the look-ahead prime, the throttle
//! windows, the reset re-arm) is expressed as a [`Timer`] measured against a
//! [`Clock`]. Nothing sleeps; the host calls [`Engine::tick`](crate::Engine::tick)
//! and due timers fire from there.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A monotonic time source.
///
/// `now()` is the elapsed time since an arbitrary, fixed origin and must never
/// go backwards.
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;
}

/// Wall-clock backed monotonic time, anchored at construction.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose origin is "now".
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so one handle can drive both the engine's
/// timers and a [`VirtualOutput`](crate::playback::VirtualOutput).
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    /// Create a manual clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        *self.now.lock() += delta;
    }

    /// Jump to an absolute time. Earlier times are ignored.
    pub fn set(&self, at: Duration) {
        let mut now = self.now.lock();
        if at > *now {
            *now = at;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}

/// A single cancelable deadline.
///
/// Arming an already armed timer replaces the old deadline. [`Timer::fire`]
/// disarms the timer when it reports due, so a deadline fires at most once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    due: Option<Duration>,
}

impl Timer {
    /// A disarmed timer.
    pub const fn new() -> Self {
        Self { due: None }
    }

    /// Arm the timer to fire `after` from `now`.
    pub fn arm(&mut self, now: Duration, after: Duration) {
        self.due = Some(now + after);
    }

    /// Disarm the timer. Returns whether it was armed.
    pub fn cancel(&mut self) -> bool {
        self.due.take().is_some()
    }

    /// Whether a deadline is pending.
    pub const fn is_armed(&self) -> bool {
        self.due.is_some()
    }

    /// The pending deadline, if any.
    pub const fn deadline(&self) -> Option<Duration> {
        self.due
    }

    /// Consume the deadline if it has passed.
    pub fn fire(&mut self, now: Duration) -> bool {
        match self.due {
            Some(due) if due <= now => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}
