//! Re-running transactions that lost a race.

use std::future::Future;

use tracing::warn;

use crate::error::EngineResult;

/// Default number of attempts per operation.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Runs `attempt` until it succeeds, fails with a non-retryable error, or
/// `max_attempts` runs are used up.
///
/// Each call to `attempt` must begin its own transaction.
pub(crate) async fn with_retry<T, F, Fut>(op: &'static str, max_attempts: u32, mut attempt: F) -> EngineResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EngineResult<T>>,
{
    let mut run = 1;
    loop {
        match attempt().await {
            Err(err) if err.is_retryable() && run < max_attempts.max(1) => {
                warn!(op, attempt = run, error = %err, "Retrying transaction");
                run += 1;
            }
            result => return result,
        }
    }
}
