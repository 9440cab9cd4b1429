//! Exponential backoff.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// Computes the wait before retry attempt `n`: `base * 2^n`.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    base: Duration,
    max: Option<Duration>,
    jitter_ratio: f64,
}

impl Backoff {
    /// Uncapped, jitter-free backoff.
    pub fn exponential(base: Duration) -> Self {
        Self {
            base,
            max: None,
            jitter_ratio: 0.0,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            base: Duration::from_millis(config.base_delay_ms),
            max: config.max_delay_ms.map(Duration::from_millis),
            jitter_ratio: config.jitter_ratio.clamp(0.0, 1.0),
        }
    }

    pub fn with_max(mut self, max: Duration) -> Self {
        self.max = Some(max);
        self
    }

    pub fn with_jitter(mut self, ratio: f64) -> Self {
        self.jitter_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    /// Deterministic delay for retry attempt `attempt` (1-based).
    /// Attempt 0 means "no retry yet" and waits nothing.
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let delay = 1u128
            .checked_shl(attempt)
            .and_then(|factor| self.base.as_nanos().checked_mul(factor))
            .map_or(Duration::MAX, duration_from_nanos);
        match self.max {
            Some(max) => delay.min(max),
            None => delay,
        }
    }

    /// `delay(attempt)` plus up to `jitter_ratio` of random extra wait.
    pub fn delay_with_jitter(&self, attempt: u32) -> Duration {
        let delay = self.delay(attempt);
        if self.jitter_ratio <= 0.0 || delay.is_zero() {
            return delay;
        }

        let extra = Duration::try_from_secs_f64(delay.as_secs_f64() * self.jitter_ratio)
            .unwrap_or(Duration::MAX);
        let jitter = rand::thread_rng().gen_range(Duration::ZERO..=extra);
        delay.saturating_add(jitter)
    }
}

/// Saturates at `Duration::MAX`.
fn duration_from_nanos(nanos: u128) -> Duration {
    const NANOS_PER_SEC: u128 = 1_000_000_000;
    match u64::try_from(nanos / NANOS_PER_SEC) {
        Ok(secs) => Duration::new(secs, (nanos % NANOS_PER_SEC) as u32),
        Err(_) => Duration::MAX,
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::exponential(Duration::from_secs(1))
    }
}
