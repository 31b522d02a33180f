//! Fibonacci backoff calculator, kept from the teacher's
//! `controllers/netbox/src/backoff.rs` as a style-consistent helper.
//!
//! The NetBox client itself does not use this: spec §7 only specifies a
//! bounded flat retry for transient transport failures (matching the
//! original `single_request()`'s actual behaviour, see DESIGN.md), so
//! [`crate::common::HttpClient`] retries immediately rather than spacing
//! attempts out. This type is retained for callers that do want a spaced
//! retry schedule (e.g. a future polling entrypoint) without re-deriving
//! the sequence.

use std::time::Duration;

/// Generates backoff durations following the Fibonacci sequence, in minutes,
/// then converted to seconds.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_minutes: u64,
    prev_minutes: u64,
    current_minutes: u64,
    max_minutes: u64,
}

impl FibonacciBackoff {
    /// `min_minutes` seeds the first two steps; the sequence is capped at `max_minutes`.
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            min_minutes,
            prev_minutes: 0,
            current_minutes: min_minutes,
            max_minutes,
        }
    }

    /// Current backoff in seconds, then advance to the next Fibonacci step.
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let result_seconds = self.current_minutes * 60;
        let next_minutes = self.prev_minutes + self.current_minutes;
        self.prev_minutes = self.current_minutes;
        self.current_minutes = std::cmp::min(next_minutes, self.max_minutes);
        result_seconds
    }

    /// Same as [`Self::next_backoff_seconds`], as a [`Duration`].
    #[must_use]
    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_secs(self.next_backoff_seconds())
    }

    /// Restart the sequence from `min_minutes`.
    pub fn reset(&mut self) {
        self.prev_minutes = 0;
        self.current_minutes = self.min_minutes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_matches_fibonacci_capped_at_max() {
        let mut backoff = FibonacciBackoff::new(1, 10);
        assert_eq!(backoff.next_backoff_seconds(), 60);
        assert_eq!(backoff.next_backoff_seconds(), 60);
        assert_eq!(backoff.next_backoff_seconds(), 120);
        assert_eq!(backoff.next_backoff_seconds(), 180);
        assert_eq!(backoff.next_backoff_seconds(), 300);
        assert_eq!(backoff.next_backoff_seconds(), 480);
        assert_eq!(backoff.next_backoff_seconds(), 600);
        assert_eq!(backoff.next_backoff_seconds(), 600);
    }

    #[test]
    fn reset_restarts_from_minimum() {
        let mut backoff = FibonacciBackoff::new(1, 10);
        backoff.next_backoff_seconds();
        backoff.next_backoff_seconds();
        backoff.next_backoff_seconds();
        backoff.reset();
        assert_eq!(backoff.next_backoff_seconds(), 60);
    }
}
