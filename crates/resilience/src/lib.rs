// crates/resilience/src/lib.rs
//! Resilience patterns for talking to a home media server
//!
//! This crate provides:
//! - A bounded-concurrency request throttle
//! - Retry with exponential backoff
//! - Timeout handling
//! - A cooperative cancellation signal
//!
//! # Example
//!
//! ```rust
//! use sublink_resilience::{RequestThrottler, RetryPolicy};
//! use std::time::Duration;
//!
//! // At most three requests in flight
//! let throttler = RequestThrottler::default();
//! assert_eq!(throttler.available_slots(), 3);
//!
//! // 1s, 2s, 4s between attempts
//! let policy = RetryPolicy::backoff();
//! assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(4));
//! ```

mod cancel;
mod error;
mod retry;
mod throttle;
mod timeout;

pub use cancel::{with_cancel, CancelSignal};
pub use error::{ResilienceError, ResilienceResult};
pub use retry::{with_retry, Attempted, RetryFailure, RetryPolicy};
pub use throttle::{RequestThrottler, ThrottleSlot, DEFAULT_MAX_CONCURRENT_REQUESTS};
pub use timeout::with_timeout;
