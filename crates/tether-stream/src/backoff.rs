//! Capped exponential backoff.

use std::time::Duration;

use tether_config::StreamConfig;

/// Exponential backoff: `min(floor * 2^(attempt - 1), ceiling)`.
///
/// Attempts are 1-based. The counter only resets through [`Backoff::reset`],
/// which the transport calls once a connection is established.
#[derive(Debug, Clone)]
pub struct Backoff {
    floor: Duration,
    ceiling: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(floor: Duration, ceiling: Duration) -> Self {
        Self {
            floor,
            ceiling,
            attempt: 0,
        }
    }

    pub fn from_config(config: &StreamConfig) -> Self {
        Self::new(config.backoff_floor(), config.backoff_ceiling())
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.floor.saturating_mul(factor).min(self.ceiling)
    }

    /// Advance the attempt counter and return its delay.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        self.delay_for_attempt(self.attempt)
    }

    /// Number of delays handed out since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubles_from_floor() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(10));
        let delays: Vec<u64> = (0..4)
            .map(|_| backoff.next_delay().as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![100, 200, 400, 800]);
    }

    #[test]
    fn test_capped_at_ceiling() {
        let backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(30));
        assert_eq!(backoff.delay_for_attempt(5), Duration::from_secs(16));
        assert_eq!(backoff.delay_for_attempt(6), Duration::from_secs(30));
        assert_eq!(backoff.delay_for_attempt(7), Duration::from_secs(30));
    }

    #[test]
    fn test_huge_attempt_does_not_overflow() {
        let backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(30));
        assert_eq!(backoff.delay_for_attempt(u32::MAX), Duration::from_secs(30));
        assert_eq!(backoff.delay_for_attempt(40), Duration::from_secs(30));
    }

    #[test]
    fn test_reset_returns_to_floor() {
        let mut backoff = Backoff::new(Duration::from_millis(50), Duration::from_secs(1));
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.attempt(), 2);

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(50));
    }

    #[test]
    fn test_matches_formula_for_every_attempt() {
        let floor = Duration::from_millis(250);
        let ceiling = Duration::from_secs(8);
        let mut backoff = Backoff::new(floor, ceiling);
        for n in 1..=12u32 {
            let expected = (floor * 2u32.pow(n - 1)).min(ceiling);
            assert_eq!(backoff.next_delay(), expected, "attempt {n}");
        }
    }
}
