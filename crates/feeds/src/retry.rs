//! Reconnect strategies for feed connections.
//!
//! The connection loop never gives up; a policy only decides how long to
//! wait before the next attempt.

use rand::Rng;
use std::time::Duration;

/// Decides the delay before the next reconnection attempt.
pub trait ReconnectPolicy: Send + Sync {
    /// Delay before attempt number `attempt` (1-based), given how long the
    /// previous connection stayed up.
    fn next_delay(&mut self, attempt: u32, connected_for: Duration) -> Duration;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Constant delay, unlimited attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay {
    pub delay: Duration,
}

impl FixedDelay {
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);

    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DELAY)
    }
}

impl ReconnectPolicy for FixedDelay {
    fn next_delay(&mut self, _attempt: u32, _connected_for: Duration) -> Duration {
        self.delay
    }

    fn name(&self) -> &'static str {
        "fixed-delay"
    }
}

/// Exponential backoff with jitter, capped at `max_delay`.
///
/// The attempt counter restarts once a connection stayed up for
/// `stable_after`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub stable_after: Duration,
    /// Fraction of the delay randomized in both directions (0.1 = ±10%)
    pub jitter_factor: f64,
    attempts: u32,
}

impl ExponentialBackoff {
    pub const DEFAULT_JITTER: f64 = 0.1;

    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
            stable_after: Duration::from_secs(300),
            jitter_factor: Self::DEFAULT_JITTER,
            attempts: 0,
        }
    }

    pub fn with_jitter(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = jitter_factor.max(0.0);
        self
    }

    fn apply_jitter(&self, delay: Duration) -> Duration {
        if self.jitter_factor <= 0.0 {
            return delay;
        }

        let base_millis = delay.as_millis() as f64;
        let range = base_millis * self.jitter_factor;
        let jitter: f64 = rand::rng().random_range(-range..=range);
        Duration::from_millis((base_millis + jitter).max(1.0) as u64)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(300))
    }
}

impl ReconnectPolicy for ExponentialBackoff {
    fn next_delay(&mut self, _attempt: u32, connected_for: Duration) -> Duration {
        if connected_for > self.stable_after {
            self.attempts = 0;
        }
        self.attempts = self.attempts.saturating_add(1);

        // max 2^8 = 256x base delay
        let power = self.attempts.min(8);
        let delay = self.base_delay.saturating_mul(1 << power);
        self.apply_jitter(delay.min(self.max_delay))
    }

    fn name(&self) -> &'static str {
        "exponential-backoff"
    }
}
