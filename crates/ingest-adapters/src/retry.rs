//! Bounded retry with backoff, shared by all three HTTP adapters.
//!
//! Mirrors the shape of `chatty_platform`'s Helix client retry loop (retry
//! on transient status, give up immediately on a permanent one) but
//! generalized to honor an external cancellation signal while waiting out
//! the backoff interval, per the controller's retry policy.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::AdapterError;

/// `attempts ≥ 1`, `interval ≥ 0`. A single attempt with `interval = 0` is
/// a valid "no retry" policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }
}

/// Runs `op` up to `policy.max_attempts` times, waiting `policy.interval`
/// between attempts. Stops early on a permanent error or on cancellation,
/// either observed directly from `op` or while waiting out the backoff.
pub async fn retry_with_backoff<F, Fut, T>(
    policy: RetryPolicy,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T, AdapterError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AdapterError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        if cancel.is_cancelled() {
            return Err(AdapterError::Cancelled);
        }

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AdapterError::Cancelled),
            result = op() => result,
        };

        match result {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() || attempt >= policy.max_attempts => return Err(err),
            Err(err) => {
                tracing::warn!(attempt, max_attempts = policy.max_attempts, error = %err, "retrying after transient upstream error");
                if policy.interval.is_zero() {
                    continue;
                }
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(AdapterError::Cancelled),
                    () = tokio::time::sleep(policy.interval) => {}
                }
            }
        }
    }
}
