// crates/resilience/src/timeout.rs
//! Deadlines for async operations

use crate::error::{ResilienceError, ResilienceResult};
use std::future::Future;
use std::time::Duration;

/// Executes an operation with a timeout.
///
/// The operation's future is dropped when the deadline passes.
pub async fn with_timeout<F>(duration: Duration, operation: F) -> ResilienceResult<F::Output>
where
    F: Future,
{
    tokio::time::timeout(duration, operation)
        .await
        .map_err(|_| ResilienceError::Timeout(duration))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timeout_success() {
        let result = with_timeout(Duration::from_secs(1), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            42
        })
        .await;

        assert_eq!(result.ok(), Some(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_exceeded() {
        let result = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            42
        })
        .await;

        assert!(matches!(result, Err(ResilienceError::Timeout(_))));
    }
}
