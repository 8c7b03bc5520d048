//! # World Clock
//!
//! Accumulated simulation time and tick counter for one world. Message
//! due times and delayed delivery are expressed in this clock's time, not
//! wall time.

/// Simulation clock, advanced once per tick by the owning thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct WorldClock {
    sim_time: f64,
    delta: f32,
    tick: u64,
}

impl WorldClock {
    /// Creates a clock at time zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sim_time: 0.0,
            delta: 0.0,
            tick: 0,
        }
    }

    /// Advances by one tick of `delta` seconds.
    pub(crate) fn advance(&mut self, delta: f32) {
        self.sim_time += f64::from(delta);
        self.delta = delta;
        self.tick += 1;
    }

    /// Accumulated simulation time in seconds.
    #[inline]
    #[must_use]
    pub const fn now(&self) -> f64 {
        self.sim_time
    }

    /// Duration of the current tick in seconds.
    #[inline]
    #[must_use]
    pub const fn delta(&self) -> f32 {
        self.delta
    }

    /// Number of completed or in-progress ticks.
    #[inline]
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_accumulates() {
        let mut clock = WorldClock::new();
        clock.advance(0.5);
        clock.advance(0.25);
        assert!((clock.now() - 0.75).abs() < 1e-9);
        assert_eq!(clock.tick(), 2);
        assert!((clock.delta() - 0.25).abs() < f32::EPSILON);
    }
}
