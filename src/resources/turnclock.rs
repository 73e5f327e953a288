//! Wall-clock cadence for turns.
//!
//! The simulation itself is step-driven. A front end that wants turns at a
//! fixed pace feeds frame deltas into a [`TurnClock`], which reports how many
//! turns are due and how far the current turn has progressed, for
//! interpolating between previous and current transforms.

/// Shortest turn the clock will pace.
pub const MIN_SECONDS_PER_TURN: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnClock {
    pub seconds_per_turn: f32,
    pub time_scale: f32,
    pub elapsed: f32,
    accumulator: f32,
}

impl Default for TurnClock {
    fn default() -> Self {
        TurnClock::new(0.5)
    }
}

impl TurnClock {
    pub fn new(seconds_per_turn: f32) -> Self {
        Self {
            seconds_per_turn: seconds_per_turn.max(MIN_SECONDS_PER_TURN),
            time_scale: 1.0,
            elapsed: 0.0,
            accumulator: 0.0,
        }
    }

    pub fn with_time_scale(mut self, time_scale: f32) -> Self {
        self.time_scale = time_scale.max(0.0);
        self
    }

    fn period(&self) -> f32 {
        self.seconds_per_turn.max(MIN_SECONDS_PER_TURN)
    }

    /// Adds `delta` seconds of wall time and returns how many turns are due.
    pub fn advance(&mut self, delta: f32) -> u32 {
        let scaled = delta.max(0.0) * self.time_scale;
        self.elapsed += scaled;
        self.accumulator += scaled;
        let period = self.period();
        let due = (self.accumulator / period).floor();
        self.accumulator = (self.accumulator - due * period).max(0.0);
        due as u32
    }

    /// Progress through the current turn, in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        (self.accumulator / self.period()).clamp(0.0, 1.0)
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.accumulator = 0.0;
    }
}
