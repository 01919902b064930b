use anyhow::Error;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retries an async HTTP operation with a fixed delay between attempts
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `retries`: Number of retry attempts (total runs = 1 initial + retries)
/// - `delay_ms`: Milliseconds between retry attempts
///
/// # Returns
/// Either the successful result or the error of the last attempt
pub async fn with_retry<F, Fut, T>(
    mut operation: F,
    retries: usize,
    delay_ms: u64,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            // client errors will not change on a retry
            Err(err) if err.status().is_some_and(|s| s.is_client_error()) => {
                return Err(err.into());
            }
            Err(err) => {
                if attempt > retries {
                    return Err(err.into());
                }
                debug!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt,
                    retries + 1,
                    err
                );
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
