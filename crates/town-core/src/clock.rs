//! World clock for AI Town.
//!
//! The tick counter is the number of completed ticks. The "current time"
//! is the wall-clock instant the last completed tick started at; agent
//! cooldowns are measured against the same instants.

use chrono::{DateTime, Utc};

/// Tick counter plus the simulated time of the last completed tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldClock {
    tick: u64,
    time: DateTime<Utc>,
}

impl WorldClock {
    /// A clock at tick zero, reading `now`.
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self { tick: 0, time: now }
    }

    /// Completed ticks.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Current simulated time.
    pub const fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// Mark one more tick complete at `now`. Time never runs backwards.
    pub fn advance(&mut self, now: DateTime<Utc>) -> u64 {
        self.tick = self.tick.saturating_add(1);
        self.time = self.time.max(now);
        self.tick
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    #[test]
    fn advance_counts_ticks() {
        let start = Utc::now();
        let mut clock = WorldClock::new(start);
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.advance(start + TimeDelta::seconds(1)), 1);
        assert_eq!(clock.advance(start + TimeDelta::seconds(2)), 2);
        assert_eq!(clock.time(), start + TimeDelta::seconds(2));
    }

    #[test]
    fn time_is_monotonic() {
        let start = Utc::now();
        let mut clock = WorldClock::new(start);
        clock.advance(start - TimeDelta::seconds(5));
        assert_eq!(clock.time(), start);
    }
}
