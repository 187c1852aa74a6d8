//! Retries for remote generation calls.
//!
//! The schedule is taken from the first failure's
//! [`AdvisoryError::retry_strategy`]. Only network-backed
//! [`GenerationClient`](crate::generation::GenerationClient)s use this; the
//! advisory pipeline itself propagates generation errors unchanged.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{AdvisoryError, RetryStrategy};

/// Re-runs a failed async call according to the error's [`RetryStrategy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryExecutor;

impl RetryExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Run `operation`, retrying while the first error's strategy allows.
    ///
    /// A later error that is not recoverable ends the loop early.
    pub async fn execute_auto<F, Fut, T>(&self, mut operation: F) -> Result<T, AdvisoryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AdvisoryError>>,
    {
        let first = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        let strategy = first.retry_strategy();
        debug!("Generation call failed, strategy {:?}: {}", strategy, first);

        let mut attempts = 1;
        let mut error = first;
        while let Some(delay) = delay_before_retry(&strategy, attempts) {
            if attempts > 1 && !error.is_recoverable() {
                break;
            }
            warn!("Attempt {} failed, retrying in {:?}: {}", attempts, delay, error);
            sleep(delay).await;
            attempts += 1;
            match operation().await {
                Ok(value) => {
                    debug!("Generation call succeeded after {} attempts", attempts);
                    return Ok(value);
                }
                Err(e) => error = e,
            }
        }
        Err(error)
    }
}

/// Delay before the next try, given how many attempts have been made, or
/// `None` once the strategy is exhausted.
fn delay_before_retry(strategy: &RetryStrategy, attempts: u32) -> Option<Duration> {
    match *strategy {
        RetryStrategy::NoRetry => None,
        RetryStrategy::WaitAndRetry { wait } => (attempts == 1).then_some(wait),
        RetryStrategy::ExponentialBackoff {
            base_delay,
            max_delay,
            max_attempts,
        } => (attempts < max_attempts).then(|| {
            base_delay
                .checked_mul(2u32.saturating_pow(attempts.saturating_sub(1)))
                .map_or(max_delay, |d| d.min(max_delay))
        }),
    }
}
