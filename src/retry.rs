//! Retry logic with linear backoff
//!
//! Both retry loops in the crate wait `n * backoff` before retry `n` (1-based):
//! the pipeline when the generation API rate-limits a request, and the downloader
//! on transport failures. [`retry_with_backoff`] implements that loop once; the
//! error type decides what is worth retrying via [`IsRetryable`].
//!
//! # Example
//!
//! ```no_run
//! use feeling_images::retry::{IsRetryable, LinearBackoff, retry_with_backoff};
//! use std::time::Duration;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Busy,
//!     Rejected,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{self:?}")
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Busy)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let policy = LinearBackoff::new(2, Duration::from_secs(1));
//! let value = retry_with_backoff(&policy, |_, _, _| {}, |_attempt| async {
//!     Ok::<_, MyError>(42)
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::error::GenerationError;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the operation should be attempted again
    fn is_retryable(&self) -> bool;
}

/// Only rate limiting is retried at the generation layer. Permanent rejections and
/// transient API errors end the leaf.
impl IsRetryable for GenerationError {
    fn is_retryable(&self) -> bool {
        matches!(self, GenerationError::RateLimited { .. })
    }
}

/// Bounded retry with linearly increasing delay
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinearBackoff {
    /// Retries allowed after the first attempt
    pub max_retries: u32,
    /// Delay unit; retry `n` waits `n * backoff`
    pub backoff: Duration,
}

impl LinearBackoff {
    /// Create a policy
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Policy allowing `attempts` total attempts (at least one)
    pub fn from_attempts(attempts: u32, backoff: Duration) -> Self {
        Self::new(attempts.saturating_sub(1), backoff)
    }

    /// Total attempts this policy allows
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff.saturating_mul(retry)
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or the
/// policy's retries are used up
///
/// `operation` receives the 1-based attempt number. `on_retry` is called with the
/// upcoming retry number, the delay about to be slept and the error that caused it,
/// before sleeping. The last error is returned unchanged when retries run out.
pub async fn retry_with_backoff<F, Fut, T, E, N>(
    policy: &LinearBackoff,
    mut on_retry: N,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
    N: FnMut(u32, Duration, &E),
{
    let mut retry = 0;

    loop {
        match operation(retry + 1).await {
            Ok(result) => {
                if retry > 0 {
                    tracing::debug!(attempts = retry + 1, "operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && retry < policy.max_retries => {
                retry += 1;
                let delay = policy.delay_for(retry);
                tracing::debug!(
                    error = %e,
                    retry,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "operation failed, retrying"
                );
                on_retry(retry, delay, &e);
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                tracing::debug!(
                    error = %e,
                    attempts = retry + 1,
                    retryable = e.is_retryable(),
                    "operation failed, not retrying"
                );
                return Err(e);
            }
        }
    }
}
