//! Retry wrapper with exponential backoff for quota failures.
//!
//! # Retry Policy
//!
//! - Max retries: 3 (4 total attempts)
//! - Initial delay: 1000ms, doubling per retry
//! - Max delay: 16 seconds
//! - Jitter: optional down-jitter, off by default
//!
//! Only errors that report [`QuotaSignal::is_quota_exhausted`] are retried.
//! Everything else propagates on the first failure.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Marks errors that mean "rate limited, try again later".
pub trait QuotaSignal {
    fn is_quota_exhausted(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retries (not counting the initial attempt).
    pub max_retries: u32,
    #[serde(with = "millis")]
    pub initial_delay: Duration,
    #[serde(with = "millis")]
    pub max_delay: Duration,
    /// Down-jitter factor (0.25 = up to 25% shorter). Zero disables jitter.
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(16),
            jitter_factor: 0.0,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `step + 1`.
    #[must_use]
    pub fn delay_for(&self, step: u32) -> Duration {
        let factor = 2u32.saturating_pow(step);
        let base = self.initial_delay.saturating_mul(factor).min(self.max_delay);
        if self.jitter_factor <= 0.0 {
            return base;
        }
        let jitter = 1.0 - rand::random::<f64>() * self.jitter_factor.min(1.0);
        Duration::from_secs_f64(base.as_secs_f64() * jitter)
    }
}

/// Run `op`, retrying quota failures with exponential backoff.
///
/// `op` is invoked once per attempt; it must rebuild whatever it sends.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: QuotaSignal + Display,
{
    let mut step = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_quota_exhausted() && step < policy.max_retries => {
                let delay = policy.delay_for(step);
                tracing::debug!(
                    error = %err,
                    retry = step + 1,
                    delay_ms = delay.as_millis(),
                    "Quota exhausted; backing off before retry"
                );
                tokio::time::sleep(delay).await;
                step += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
