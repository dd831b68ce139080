// crates/resilience/src/error.rs
//! Error types for resilience operations

use thiserror::Error;

/// Result type for resilience operations
pub type ResilienceResult<T> = Result<T, ResilienceError>;

/// Errors that can occur in resilience operations
#[derive(Debug, Error)]
pub enum ResilienceError {
    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The throttle semaphore was closed while waiting for a slot
    #[error("Request throttle is closed")]
    ThrottleClosed,

    /// Operation was cancelled
    #[error("Operation was cancelled")]
    Cancelled,
}
