use std::time::Duration;

use rand::Rng;

use crate::BackoffPolicy;

/// Exponential delay sequence driven by a [`BackoffPolicy`].
///
/// Delays double from `base_delay_ms` up to `max_delay_ms`. With jitter
/// enabled each delay is scaled by a random factor in `[0.5, 1.5)` and then
/// clamped to the maximum.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    policy: BackoffPolicy,
    current: Duration,
    attempts: usize,
}

impl ExponentialBackoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            current: Duration::from_millis(policy.base_delay_ms),
            policy,
            attempts: 0,
        }
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Delays handed out since the last reset
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn next_delay(&mut self) -> Duration {
        let max = Duration::from_millis(self.policy.max_delay_ms);
        let delay = self.current.min(max);

        self.attempts += 1;
        self.current = self.current.saturating_mul(2).min(max);

        if self.policy.jitter {
            let factor = rand::thread_rng().gen_range(0.5..1.5);
            Duration::from_secs_f64(delay.as_secs_f64() * factor).min(max)
        } else {
            delay
        }
    }

    pub fn reset(&mut self) {
        self.current = Duration::from_millis(self.policy.base_delay_ms);
        self.attempts = 0;
    }
}
