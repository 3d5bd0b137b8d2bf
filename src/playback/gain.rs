//! Linear gain automation on the output clock.

/// A linear gain ramp from `from` at `start` to `to` at `end`, in seconds
/// on the output clock. Before `start` the gain is `from`, after `end` it
/// holds at `to`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainRamp {
    pub from: f32,
    pub to: f32,
    pub start: f64,
    pub end: f64,
}

impl GainRamp {
    /// A constant gain.
    pub const fn constant(gain: f32) -> Self {
        Self {
            from: gain,
            to: gain,
            start: 0.0,
            end: 0.0,
        }
    }

    /// Ramp from the gain currently in effect at `now` to `target`.
    pub fn towards(&self, now: f64, target: f32, seconds: f64) -> Self {
        Self {
            from: self.value_at(now),
            to: target,
            start: now,
            end: now + seconds.max(0.0),
        }
    }

    /// Gain at time `t`.
    pub fn value_at(&self, t: f64) -> f32 {
        if t <= self.start {
            return self.from;
        }
        if t >= self.end {
            return self.to;
        }
        let progress = ((t - self.start) / (self.end - self.start)) as f32;
        self.from + (self.to - self.from) * progress
    }

    /// Whether the ramp has finished at `t`.
    pub fn is_settled(&self, t: f64) -> bool {
        t >= self.end
    }
}

impl Default for GainRamp {
    fn default() -> Self {
        Self::constant(0.0)
    }
}
