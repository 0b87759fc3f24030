use std::future::Future;

use tokio::time::sleep;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::warn;

use super::backoff::ExponentialBackoff;
use crate::BackoffPolicy;
use crate::Error;
use crate::Result;
use crate::UsageError;

/// Run `task` until it succeeds, retrying with exponential backoff.
///
/// - each attempt is bounded by `policy.timeout_ms` (0 = unbounded)
/// - `on_failure` sees every failed attempt before the backoff sleep
/// - gives up after `policy.max_retries` attempts (0 = never) with
///   [`Error::RetryExhausted`] wrapping the last failure
/// - returns [`UsageError::Stopped`] as soon as `token` is cancelled
pub(crate) async fn task_with_timeout_and_exponential_backoff<F, T, P, O>(
    operation: &str,
    mut task: F,
    policy: BackoffPolicy,
    token: &CancellationToken,
    on_failure: O,
) -> Result<P>
where
    F: FnMut() -> T,
    T: Future<Output = Result<P>>,
    O: Fn(&Error),
{
    let mut backoff = ExponentialBackoff::new(policy);
    let mut attempts = 0;

    loop {
        attempts += 1;

        let attempt = task();
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(UsageError::Stopped.into()),
            r = async {
                match policy.attempt_timeout() {
                    Some(after) => timeout(after, attempt).await.unwrap_or_else(|_| {
                        Err(Error::Timeout {
                            operation: operation.to_string(),
                            after,
                        })
                    }),
                    None => attempt.await,
                }
            } => r,
        };

        let err = match outcome {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        on_failure(&err);

        if !policy.is_unlimited() && attempts >= policy.max_retries {
            error!(operation, attempts, error = %err, "task failed after max retries");
            return Err(Error::RetryExhausted {
                operation: operation.to_string(),
                attempts,
                source: Box::new(err),
            });
        }

        let delay = backoff.next_delay();
        warn!(
            operation,
            attempt = attempts,
            error = %err,
            delay_ms = delay.as_millis() as u64,
            "task failed, retrying"
        );

        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(UsageError::Stopped.into()),
            _ = sleep(delay) => {}
        }
    }
}
