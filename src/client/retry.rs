//! Bounded exponential-backoff retry
//!
//! Wraps a fallible async operation with up to `max_attempts` executions.
//! Cancellation is checked before every backoff sleep and the sleep itself is
//! raced against the shutdown signal, so a cancelled caller never waits out a
//! backoff window.

use std::future::Future;
use tokio::time::sleep;
use tracing::warn;

use crate::client::config::calculate_backoff;
use crate::client::{ClientError, ClientResult};
use crate::shutdown::ShutdownCoordinator;

/// Run `op` up to `max_attempts` times with exponential backoff.
///
/// Success on any attempt short-circuits with that value. A
/// [`ClientError::Cancelled`] from the operation, or cancellation observed
/// between attempts, propagates immediately without further attempts. Once
/// attempts are exhausted the *last* failure is returned wrapped in
/// [`ClientError::RetryExhausted`].
pub async fn run<T, F, Fut>(
    shutdown: &ShutdownCoordinator,
    max_attempts: u32,
    mut op: F,
) -> ClientResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ClientResult<T>>,
{
    let mut last_error = None;

    for attempt in 0..max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(ClientError::Cancelled) => return Err(ClientError::Cancelled),
            Err(error) => {
                warn!(
                    attempt = attempt + 1,
                    max_attempts,
                    error = %error,
                    "operation attempt failed"
                );
                last_error = Some(error);
            }
        }

        if shutdown.is_shutdown_requested() {
            return Err(ClientError::Cancelled);
        }

        if attempt + 1 < max_attempts {
            let delay = calculate_backoff(attempt);
            tokio::select! {
                _ = sleep(delay) => {}
                _ = shutdown.wait_for_shutdown() => return Err(ClientError::Cancelled),
            }
        }
    }

    Err(ClientError::RetryExhausted(Box::new(last_error.unwrap_or_else(
        || ClientError::Network("no attempts were made".to_string()),
    ))))
}
