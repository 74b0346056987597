/// A point on the simulation timeline, in milliseconds since the session began.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct SimTime {
    millis: f64,
}

impl SimTime {
    pub const ZERO: SimTime = SimTime { millis: 0.0 };

    pub const fn from_millis(millis: f64) -> Self {
        Self { millis }
    }

    pub fn as_millis(self) -> f64 {
        self.millis
    }

    pub fn millis_since(self, earlier: SimTime) -> f64 {
        self.millis - earlier.millis
    }

    pub fn advanced_by(self, delta_ms: f64) -> Self {
        Self {
            millis: self.millis + delta_ms,
        }
    }
}

/// Monotonic simulation clock threaded through every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimClock {
    now: SimTime,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(now: SimTime) -> Self {
        Self { now }
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Negative and non-finite deltas are ignored so time never runs backwards.
    pub fn advance(&mut self, delta_ms: f32) -> SimTime {
        if delta_ms.is_finite() && delta_ms > 0.0 {
            self.now = self.now.advanced_by(f64::from(delta_ms));
        }
        self.now
    }
}
