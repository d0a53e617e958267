//! Lamport logical clock
//!
//! A single monotonic counter. The clock itself is not synchronized:
//! the server keeps it behind the same lock as the client registry, and
//! the interactive client keeps its own copy behind a mutex.

use crate::types::Timestamp;

/// Lamport clock
///
/// Every value returned by [`observe`](Self::observe) or [`tick`](Self::tick)
/// is strictly greater than every value previously returned or observed.
/// A step that would pass `u64::MAX` is refused and leaves the clock as it was.
#[derive(Debug, Default, Clone)]
pub struct LamportClock {
    value: Timestamp,
}

impl LamportClock {
    /// Create a clock starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a remote timestamp: `max(current, remote) + 1`
    ///
    /// Returns `None` if the result does not fit in a `Timestamp`.
    pub fn observe(&mut self, remote: Timestamp) -> Option<Timestamp> {
        self.value = self.value.max(remote).checked_add(1)?;
        Some(self.value)
    }

    /// Advance for a locally generated event
    ///
    /// Returns `None` once the clock is exhausted.
    pub fn tick(&mut self) -> Option<Timestamp> {
        self.value = self.value.checked_add(1)?;
        Some(self.value)
    }

    /// Current value without advancing
    pub fn now(&self) -> Timestamp {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_tick_increments_by_one() {
        let mut clock = LamportClock::new();
        assert_eq!(clock.tick(), Some(1));
        assert_eq!(clock.tick(), Some(2));
        assert_eq!(clock.now(), 2);
    }

    #[test]
    fn test_observe_jumps_past_remote() {
        let mut clock = LamportClock::new();
        assert_eq!(clock.observe(10), Some(11));
        assert_eq!(clock.now(), 11);
    }

    #[test]
    fn test_observe_stale_remote_still_advances() {
        let mut clock = LamportClock::new();
        clock.observe(10);
        assert_eq!(clock.observe(3), Some(12));
    }

    #[test]
    fn test_random_sequence_strictly_increasing() {
        let mut rng = rand::thread_rng();
        let mut clock = LamportClock::new();
        let mut highest_seen = 0;

        for _ in 0..1_000 {
            let value = if rng.gen_bool(0.5) {
                let remote = rng.gen_range(0..5_000);
                let value = clock.observe(remote).unwrap();
                assert!(value > remote);
                value
            } else {
                clock.tick().unwrap()
            };
            assert!(value > highest_seen);
            highest_seen = value;
        }
    }

    #[test]
    fn test_observe_max_refused_without_moving() {
        let mut clock = LamportClock::new();
        clock.observe(7);

        assert_eq!(clock.observe(Timestamp::MAX), None);
        assert_eq!(clock.now(), 8);
        assert_eq!(clock.observe(3), Some(9));
        assert_eq!(clock.tick(), Some(10));
    }

    #[test]
    fn test_exhausted_clock_never_repeats() {
        let mut clock = LamportClock::new();
        assert_eq!(clock.observe(Timestamp::MAX - 1), Some(Timestamp::MAX));

        assert_eq!(clock.tick(), None);
        assert_eq!(clock.observe(0), None);
        assert_eq!(clock.now(), Timestamp::MAX);
    }
}
