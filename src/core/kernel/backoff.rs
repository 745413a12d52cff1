use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;

/// Reconnect delay schedule: `initial`, doubling per consecutive failure,
/// capped at `max`. `reset` starts the schedule over.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    initial: Duration,
    max: Duration,
    strategy: ExponentialBackoff,
    attempt: u32,
}

impl ReconnectBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            strategy: Self::strategy(),
            attempt: 0,
        }
    }

    // Yields 2, 4, 8, ... (saturating); halved, that is the multiplier
    // 2^(attempt-1) applied to `initial`.
    fn strategy() -> ExponentialBackoff {
        ExponentialBackoff::from_millis(2)
    }

    /// Delay before the next reconnect attempt.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        let multiplier = self
            .strategy
            .next()
            .map_or(u64::MAX, |step| step.as_millis().try_into().unwrap_or(u64::MAX) / 2);
        let multiplier = u32::try_from(multiplier).unwrap_or(u32::MAX);
        self.initial.saturating_mul(multiplier).min(self.max)
    }

    /// Consecutive failures since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.strategy = Self::strategy();
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(delays: &[Duration]) -> Vec<u64> {
        delays.iter().map(Duration::as_secs).collect()
    }

    #[test]
    fn test_doubles_and_caps() {
        let mut backoff = ReconnectBackoff::new(Duration::from_secs(5), Duration::from_secs(60));
        let delays: Vec<Duration> = (0..7).map(|_| backoff.next_delay()).collect();
        assert_eq!(secs(&delays), vec![5, 10, 20, 40, 60, 60, 60]);
        assert_eq!(backoff.attempt(), 7);
    }

    #[test]
    fn test_matches_closed_form() {
        let mut backoff = ReconnectBackoff::new(Duration::from_secs(5), Duration::from_secs(60));
        for k in 1..=12u32 {
            let expected = (5u64 * 2u64.pow(k - 1)).min(60);
            assert_eq!(backoff.next_delay(), Duration::from_secs(expected), "attempt {k}");
        }
    }

    #[test]
    fn test_reset_starts_over() {
        let mut backoff = ReconnectBackoff::new(Duration::from_secs(5), Duration::from_secs(60));
        backoff.next_delay();
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_secs(5));
        assert_eq!(backoff.next_delay(), Duration::from_secs(10));
    }

    #[test]
    fn test_sub_second_schedule() {
        let mut backoff =
            ReconnectBackoff::new(Duration::from_millis(100), Duration::from_millis(350));
        let delays: Vec<u128> = (0..4).map(|_| backoff.next_delay().as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 350, 350]);
    }

    #[test]
    fn test_exact_initial_for_uneven_values() {
        let mut backoff =
            ReconnectBackoff::new(Duration::from_millis(5001), Duration::from_secs(60));
        assert_eq!(backoff.next_delay(), Duration::from_millis(5001));
        assert_eq!(backoff.next_delay(), Duration::from_millis(10002));

        let mut backoff = ReconnectBackoff::new(Duration::from_millis(1), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_millis(1));
        assert_eq!(backoff.next_delay(), Duration::from_millis(2));

        let mut backoff =
            ReconnectBackoff::new(Duration::from_micros(1500), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_micros(1500));
        assert_eq!(backoff.next_delay(), Duration::from_micros(3000));
    }

    #[test]
    fn test_long_outage_stays_at_cap() {
        let mut backoff = ReconnectBackoff::new(Duration::from_secs(5), Duration::from_secs(60));
        let last = (0..200).map(|_| backoff.next_delay()).last();
        assert_eq!(last, Some(Duration::from_secs(60)));
    }
}
