//! Exponential backoff for store writes.
//!
//! Only errors whose kind reports [`is_retryable`](libris_cache::error::ErrorKind::is_retryable)
//! are tried again. A duplicate key is an answer, not a failure, and is
//! returned straight away.

use libris_cache::error::Result as CacheResult;
use libris_config::RetryConfig;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, warn};

const BACKOFF_MULTIPLIER: f64 = 2.0;
const MAX_JITTER: Duration = Duration::from_millis(500);

/// How often and how patiently to retry a transient failure.
///
/// With the defaults the waits are roughly 1s and 2s before the third and
/// final attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts in total, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}
impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}
impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay(),
            max_delay: config.max_delay(),
        }
    }
}
impl RetryPolicy {
    /// Wait before the attempt following failed attempt number `attempt`
    /// (1-indexed): `min(base * 2^(attempt - 1), max)` plus up to half of
    /// that again (capped at 500ms) as jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay_ms = self.base_delay.as_millis() as f64 * BACKOFF_MULTIPLIER.powi(exponent);
        let capped = Duration::from_millis(delay_ms.min(self.max_delay.as_millis() as f64) as u64);
        capped + Self::jitter(capped / 2)
    }

    fn jitter(limit: Duration) -> Duration {
        let limit_ms = limit.min(MAX_JITTER).as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(0..=limit_ms))
    }

    /// Run `operation` until it succeeds, fails permanently, or runs out of
    /// attempts. The last error is returned.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> CacheResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CacheResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= self.max_attempts => {
                    warn!(attempts = attempt, error = ?e, "giving up after retries");
                    return Err(e);
                },
                Err(e) => {
                    let delay = self.delay(attempt);
                    debug!(attempt, delay_ms = delay.as_millis() as u64, error = ?e, "retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libris_cache::error::ErrorKind;
    use std::ops::Deref;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(max_attempts: u32) -> RetryPolicy {
        RetryPolicy { max_attempts, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(4) }
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = RetryPolicy::default();
        let first = policy.delay(1);
        assert!(first >= Duration::from_secs(1) && first <= Duration::from_millis(1500));
        let second = policy.delay(2);
        assert!(second >= Duration::from_secs(2) && second <= Duration::from_millis(2500));
        let capped = policy.delay(20);
        assert!(capped >= Duration::from_secs(32) && capped <= Duration::from_millis(32_500));
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let calls = AtomicU32::new(0);
        let value = quick(3)
            .run(|| async {
                match calls.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => Err(exn::Exn::from(ErrorKind::Busy)),
                    _ => Ok("stored"),
                }
            })
            .await
            .unwrap();
        assert_eq!(value, "stored");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let err = quick(3)
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(exn::Exn::from(ErrorKind::Busy))
            })
            .await
            .unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::Busy));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_duplicate_is_never_retried() {
        let calls = AtomicU32::new(0);
        let err = quick(5)
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(exn::Exn::from(ErrorKind::Duplicate))
            })
            .await
            .unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::Duplicate));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
