//! Uniform retry-with-backoff for provider calls.
//!
//! Every provider call site in the orchestrator routes through
//! [`retry_with_backoff`] instead of re-implementing the policy inline, so
//! the cap/base/factor only live in one place — a single reusable helper
//! keyed on [`ErrorKind`].

use memora_core::{ErrorKind, ProviderError};
use std::future::Future;
use std::time::Duration;

/// Retry policy parameters.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first (default 3).
    pub max_attempts: u32,
    /// Delay before the first retry (default 250ms).
    pub base_delay: Duration,
    /// Multiplier applied to the delay after each retry (default 2.0).
    pub factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            factor: 2.0,
        }
    }
}

/// Calls `op` and retries with exponential backoff while it fails with
/// [`ErrorKind::Transient`], up to `policy.max_attempts` attempts total.
///
/// `Permanent` and `Malformed` failures are returned immediately.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    mut op: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut delay = policy.base_delay;
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.kind() == ErrorKind::Transient && attempt < policy.max_attempts => {
                tokio::time::sleep(delay).await;
                delay = delay.mul_f64(policy.factor);
            }
            Err(err) => return Err(err),
        }
    }
}

/// Calls `op` under a per-attempt `timeout`, retrying with backoff the same
/// way [`retry_with_backoff`] does. An elapsed timeout is reported as an
/// [`ErrorKind::Transient`] [`ProviderError`], so it retries like any other
/// transient failure rather than needing its own branch in every call site.
pub async fn retry_with_timeout<T, F, Fut>(
    policy: RetryPolicy,
    timeout: Duration,
    mut op: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    retry_with_backoff(policy, move || {
        let attempt = op();
        async move {
            match tokio::time::timeout(timeout, attempt).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::transient(anyhow::anyhow!(
                    "provider call timed out after {timeout:?}"
                ))),
            }
        }
    })
    .await
}
