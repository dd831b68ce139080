// crates/resilience/src/cancel.rs
//! Cooperative cancellation signal shared between a caller and its operations

use crate::error::{ResilienceError, ResilienceResult};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// A clonable cancellation flag.
///
/// Every clone observes the same flag. Once cancelled a signal stays
/// cancelled; create a new one for the next operation.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelSignal {
    /// Creates a signal that has not been cancelled
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Cancels every operation observing this signal
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Completes when the signal is cancelled
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            // The sender lives as long as `self`, so this cannot resolve.
            std::future::pending::<()>().await;
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `operation` until it completes or `signal` fires.
///
/// With no signal this simply awaits the operation. When the signal wins the
/// operation's future is dropped, which cancels it.
pub async fn with_cancel<F>(signal: Option<&CancelSignal>, operation: F) -> ResilienceResult<F::Output>
where
    F: Future,
{
    match signal {
        None => Ok(operation.await),
        Some(signal) => {
            tokio::select! {
                biased;
                _ = signal.cancelled() => Err(ResilienceError::Cancelled),
                output = operation => Ok(output),
            }
        }
    }
}
