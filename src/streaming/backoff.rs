//! Capped exponential back-off state for reconnection scheduling

use std::time::Duration;

use crate::config::BackoffConfig;

/// Retry delay state: starts at the floor, doubles per failed attempt,
/// never exceeds the ceiling, resets to the floor on success.
///
/// With the default 1 s floor / 8 s ceiling this yields the
/// 1-2-4-8-8-8… retry cadence.
#[derive(Debug, Clone)]
pub struct Backoff {
    floor: Duration,
    ceiling: Duration,
    current: Duration,
}

impl Backoff {
    /// Create back-off state. A ceiling below the floor is raised to it.
    #[must_use]
    pub fn new(floor: Duration, ceiling: Duration) -> Self {
        let ceiling = ceiling.max(floor);
        Self {
            floor,
            ceiling,
            current: floor,
        }
    }

    /// Build from the operator-tunable config section.
    #[must_use]
    pub fn from_config(config: &BackoffConfig) -> Self {
        Self::new(
            Duration::from_secs(config.floor_secs),
            Duration::from_secs(config.ceiling_secs),
        )
    }

    /// Take the delay to wait before the next attempt, then double the
    /// stored delay (capped at the ceiling).
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.ceiling);
        delay
    }

    /// Reset to the floor delay. Called on every successful connection.
    pub fn reset(&mut self) {
        self.current = self.floor;
    }

    /// The delay the next call to [`next_delay`](Self::next_delay) will return.
    #[must_use]
    pub fn current(&self) -> Duration {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn delay_sequence_doubles_to_ceiling() {
        let mut backoff = Backoff::new(secs(1), secs(8));
        let delays: Vec<u64> = (0..6).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 8, 8]);
    }

    #[test]
    fn reset_returns_to_floor() {
        let mut backoff = Backoff::new(secs(1), secs(8));
        backoff.next_delay();
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.current(), secs(8));

        backoff.reset();
        assert_eq!(backoff.next_delay(), secs(1));
        assert_eq!(backoff.next_delay(), secs(2));
    }

    #[test]
    fn delay_never_leaves_bounds() {
        let mut backoff = Backoff::new(secs(1), secs(8));
        for _ in 0..100 {
            let d = backoff.next_delay();
            assert!(d >= secs(1) && d <= secs(8), "delay out of bounds: {d:?}");
        }
    }

    #[test]
    fn ceiling_below_floor_is_raised() {
        let mut backoff = Backoff::new(secs(5), secs(2));
        assert_eq!(backoff.next_delay(), secs(5));
        assert_eq!(backoff.next_delay(), secs(5));
    }

    #[test]
    fn from_config_uses_tuned_bounds() {
        let config = BackoffConfig {
            floor_secs: 2,
            ceiling_secs: 16,
        };
        let mut backoff = Backoff::from_config(&config);
        let delays: Vec<u64> = (0..5).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![2, 4, 8, 16, 16]);
    }
}
