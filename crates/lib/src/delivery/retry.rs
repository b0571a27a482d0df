//! Retry policy and the backoff step function.
//!
//! The loop in [`super::DeliveryClient::send`] owns no timing logic of its own: it asks
//! [`Backoff::after_failure`] what to do next and hands the returned delay to a sleeper.

use crate::config::DeliveryConfig;
use std::time::Duration;

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Wait before the second attempt; doubled before each later one.
    pub initial_delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
        }
    }

    /// Ordinary sends: 3 attempts, 1000ms base.
    pub const fn send_default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }

    /// Read receipts: 3 attempts, 500ms base.
    pub const fn read_receipt_default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }

    pub fn send_from_config(config: &DeliveryConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.initial_delay_ms),
        )
    }

    pub fn read_receipt_from_config(config: &DeliveryConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.read_receipt_delay_ms),
        )
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Wait before `attempt` (1-based). `None` for the first attempt and for attempts past the limit.
    pub fn delay_before(&self, attempt: u32) -> Option<Duration> {
        if attempt < 2 || attempt > self.attempts() {
            return None;
        }
        let doublings = (attempt - 2).min(31);
        Some(self.initial_delay.saturating_mul(1u32 << doublings))
    }

    pub fn start(&self) -> Backoff {
        Backoff {
            attempt: 1,
            delay: self.initial_delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::send_default()
    }
}

/// State of one logical send: which attempt is next and how long to wait if it fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub attempt: u32,
    pub delay: Duration,
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Wait `wait`, then run attempt `next.attempt`.
    Retry { wait: Duration, next: Backoff },
    /// No attempts remain.
    GiveUp,
}

impl Backoff {
    pub fn after_failure(self, policy: &RetryPolicy) -> Step {
        if self.attempt >= policy.attempts() {
            return Step::GiveUp;
        }
        Step::Retry {
            wait: self.delay,
            next: Backoff {
                attempt: self.attempt + 1,
                delay: self.delay.saturating_mul(2),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waits(policy: RetryPolicy) -> Vec<u64> {
        let mut state = policy.start();
        let mut out = Vec::new();
        while let Step::Retry { wait, next } = state.after_failure(&policy) {
            out.push(wait.as_millis() as u64);
            state = next;
        }
        out
    }

    #[test]
    fn three_attempts_wait_twice_doubling() {
        assert_eq!(waits(RetryPolicy::send_default()), vec![1000, 2000]);
        assert_eq!(waits(RetryPolicy::read_receipt_default()), vec![500, 1000]);
    }

    #[test]
    fn longer_policy_keeps_doubling() {
        let p = RetryPolicy::new(5, Duration::from_millis(100));
        assert_eq!(waits(p), vec![100, 200, 400, 800]);
    }

    #[test]
    fn delay_before_matches_the_step_function() {
        let p = RetryPolicy::new(4, Duration::from_millis(300));
        let stepped: Vec<u64> = waits(p);
        let direct: Vec<u64> = (2..=4)
            .map(|a| p.delay_before(a).unwrap().as_millis() as u64)
            .collect();
        assert_eq!(stepped, direct);
        assert_eq!(p.delay_before(1), None);
        assert_eq!(p.delay_before(5), None);
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        let p = RetryPolicy::new(0, Duration::from_millis(100));
        assert_eq!(p.attempts(), 1);
        assert_eq!(p.start().after_failure(&p), Step::GiveUp);
    }

    #[test]
    fn from_config_uses_separate_bases() {
        let c = DeliveryConfig {
            max_retries: 4,
            initial_delay_ms: 250,
            read_receipt_delay_ms: 50,
            request_timeout_secs: 10,
        };
        assert_eq!(
            RetryPolicy::send_from_config(&c),
            RetryPolicy::new(4, Duration::from_millis(250))
        );
        assert_eq!(
            RetryPolicy::read_receipt_from_config(&c).initial_delay,
            Duration::from_millis(50)
        );
    }
}
