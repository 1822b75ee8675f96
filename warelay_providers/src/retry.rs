use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;
use warelay_core::CompletionError;

/// Bounded retry schedule for transient completion failures.
///
/// Delays grow linearly: attempt 1 waits `base_delay`, attempt 2 waits
/// `2 * base_delay`, and so on. Permanent failures are never retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay to wait after the given (1-based) failed attempt.
    #[must_use]
    pub const fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Retry an async operation while it fails with a transient signal.
///
/// # Returns
/// The first success, the first permanent error, or the last transient
/// error once `policy.max_attempts` is exhausted.
pub async fn retry_transient<F, Fut, T>(
    mut operation: F,
    policy: &RetryPolicy,
) -> Result<T, CompletionError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, CompletionError>>,
{
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(CompletionError::Transient(reason)) => {
                if attempt >= policy.max_attempts {
                    return Err(CompletionError::Transient(reason));
                }
                let delay = policy.delay_for(attempt);
                warn!(
                    "Completion attempt {attempt}/{} failed: {reason}. Retrying after {}ms...",
                    policy.max_attempts,
                    delay.as_millis()
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
