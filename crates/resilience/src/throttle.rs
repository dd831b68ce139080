// crates/resilience/src/throttle.rs
//! Bounded-concurrency admission control for outbound requests

use crate::cancel::{with_cancel, CancelSignal};
use crate::error::{ResilienceError, ResilienceResult};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Number of requests allowed in flight at once by default
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 3;

/// Limits how many gated operations run at the same time.
///
/// Clones share the same pool of slots, so one throttler constructed at
/// startup bounds every caller it is handed to. Waiters are not served in
/// any guaranteed order.
#[derive(Debug, Clone)]
pub struct RequestThrottler {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

/// A held throttle slot. Dropping it returns the slot to the pool.
#[derive(Debug)]
pub struct ThrottleSlot {
    _permit: OwnedSemaphorePermit,
    acquired_at: Instant,
}

impl ThrottleSlot {
    /// How long this slot has been held
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }
}

impl Drop for ThrottleSlot {
    fn drop(&mut self) {
        log::trace!("Releasing throttle slot after {:?}", self.held_for());
    }
}

impl RequestThrottler {
    /// Creates a throttler allowing `max_concurrent` operations at once
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    /// Waits for a free slot
    pub async fn acquire(&self) -> ResilienceResult<ThrottleSlot> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| ResilienceError::ThrottleClosed)?;

        Ok(ThrottleSlot {
            _permit: permit,
            acquired_at: Instant::now(),
        })
    }

    /// Waits for a free slot unless `signal` is cancelled first
    pub async fn acquire_with_cancel(&self, signal: &CancelSignal) -> ResilienceResult<ThrottleSlot> {
        with_cancel(Some(signal), self.acquire()).await?
    }

    /// Runs `operation` while holding a slot.
    ///
    /// The slot is released when the operation finishes, fails, panics or is
    /// dropped before completion.
    pub async fn execute<F>(&self, operation: F) -> ResilienceResult<F::Output>
    where
        F: Future,
    {
        let _slot = self.acquire().await?;
        Ok(operation.await)
    }

    /// Free slots right now. Diagnostic only; it may be stale by the time it
    /// is read.
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Total number of slots
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}

impl Default for RequestThrottler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT_REQUESTS)
    }
}
