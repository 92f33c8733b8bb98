//! Retry loop for release API calls.

use crate::config::RetryPolicy;
use crate::error::ClientError;

/// Retry an async operation with a fixed delay between attempts
///
/// Retryable errors (transport failures, HTTP 408/429/5xx) are retried until
/// the policy is exhausted; everything else is returned immediately.
///
/// # Arguments
/// * `operation` - Async closure producing one attempt
/// * `policy` - Retry count and inter-retry delay
/// * `operation_name` - Human-readable name for logging
pub async fn retry_with_delay<F, T, Fut>(
    mut operation: F,
    policy: RetryPolicy,
    operation_name: &str,
) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ClientError>>,
{
    let mut attempts = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempts > 0 {
                    log::info!("{} succeeded after {} retry(ies)", operation_name, attempts);
                }
                return Ok(result);
            }
            Err(e) => {
                if !e.is_retryable() {
                    log::debug!("{} failed with unrecoverable error: {}", operation_name, e);
                    return Err(e);
                }

                if attempts >= policy.retries {
                    log::warn!(
                        "{} failed after {} attempt(s): {}",
                        operation_name,
                        attempts + 1,
                        e
                    );
                    return Err(e);
                }

                attempts += 1;
                log::warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {}ms",
                    operation_name,
                    attempts,
                    policy.max_attempts(),
                    e,
                    policy.delay.as_millis()
                );

                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }
}
