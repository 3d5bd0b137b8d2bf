//! Trailing-edge throttling against an injected clock.

use crate::clock::Timer;
use std::time::Duration;

/// Collapses bursts of changes into one push per window.
///
/// The first change after a quiet period opens a window; when the window
/// closes the owner pushes whatever the state is at that moment. Further
/// changes inside an open window only update the state that will be pushed.
#[derive(Debug, Clone)]
pub struct Throttle {
    window: Duration,
    timer: Timer,
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            timer: Timer::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a change at `now`.
    pub fn request(&mut self, now: Duration) {
        if !self.timer.is_armed() {
            self.timer.arm(now, self.window);
        }
    }

    /// Whether the open window closed by `now`. Reports each window once.
    pub fn due(&mut self, now: Duration) -> bool {
        self.timer.fire(now)
    }

    /// Whether a push is waiting for its window to close.
    pub fn is_pending(&self) -> bool {
        self.timer.is_armed()
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.timer.deadline()
    }

    /// Drop the open window. Returns whether one was open.
    pub fn cancel(&mut self) -> bool {
        self.timer.cancel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(200);

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn burst_yields_one_push_at_window_end() {
        let mut throttle = Throttle::new(WINDOW);
        let mut pushes = Vec::new();

        for t in (0..200).step_by(10) {
            throttle.request(ms(t));
            if throttle.due(ms(t)) {
                pushes.push(t);
            }
        }
        for t in 200..600 {
            if throttle.due(ms(t)) {
                pushes.push(t);
            }
        }
        assert_eq!(pushes, vec![200]);
    }

    #[test]
    fn change_after_window_opens_a_new_one() {
        let mut throttle = Throttle::new(WINDOW);
        throttle.request(ms(0));
        assert!(throttle.due(ms(200)));
        assert!(!throttle.is_pending());

        throttle.request(ms(250));
        assert_eq!(throttle.deadline(), Some(ms(450)));
        assert!(!throttle.due(ms(449)));
        assert!(throttle.due(ms(450)));
    }

    #[test]
    fn quiet_throttle_never_fires() {
        let mut throttle = Throttle::new(WINDOW);
        assert!(!throttle.due(ms(10_000)));
    }

    #[test]
    fn cancel_drops_pending_push() {
        let mut throttle = Throttle::new(WINDOW);
        throttle.request(ms(0));
        assert!(throttle.cancel());
        assert!(!throttle.due(ms(500)));
    }
}
