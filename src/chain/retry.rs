use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;

use crate::chain::decode::looks_like_revert;

/// Backoff settings for transient RPC failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(250),
            max_jitter: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_jitter: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), base_delay, max_jitter }
    }

    /// Single attempt, no sleeping. Used by tests and one-shot tools.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Delay before retry number `retry` (0-based): base * 2^retry plus uniform jitter.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(1u32 << retry.min(16));
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        exp.saturating_add(Duration::from_millis(jitter))
    }
}

/// Failure left after the retry budget is spent, or a non-retryable one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub message: String,
    pub attempts: u32,
}

/// Rate limiting, timeouts, dropped connections and 5xx gateways. Reverts never are.
pub fn is_retryable(message: &str) -> bool {
    if looks_like_revert(message) {
        return false;
    }
    let m = message.to_ascii_lowercase();
    [
        "429",
        "too many requests",
        "rate limit",
        "timed out",
        "timeout",
        "connection",
        "error sending request",
        "502",
        "503",
        "504",
        "temporarily unavailable",
    ]
    .iter()
    .any(|needle| m.contains(needle))
}

pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut call: F,
) -> Result<T, TransportFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, String>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match call().await {
            Ok(value) => return Ok(value),
            Err(message) if attempt < policy.max_attempts && is_retryable(&message) => {
                let delay = policy.backoff(attempt - 1);
                log::warn!(
                    "{}: attempt {}/{} failed ({}), retrying in {:?}",
                    operation, attempt, policy.max_attempts, message, delay
                );
                sleep(delay).await;
            }
            Err(message) => return Err(TransportFailure { message, attempts: attempt }),
        }
    }
}
