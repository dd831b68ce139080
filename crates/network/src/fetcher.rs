// crates/network/src/fetcher.rs
//! Retrying GET for API calls and artwork downloads

use crate::client::{HttpResponse, HttpTransport};
use crate::error::{FetchStatus, NetworkError, NetworkResult};
use bytes::Bytes;
use reqwest::StatusCode;
use std::sync::Arc;
use sublink_resilience::{with_cancel, with_retry, CancelSignal, RetryFailure, RetryPolicy};

/// Statuses that signal a temporary server condition worth retrying
pub fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE
    )
}

/// A successful fetch
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Attempts made, including the successful one
    pub attempts: usize,
    pub status: StatusCode,
    pub body: Bytes,
}

impl FetchOutcome {
    pub fn final_status(&self) -> FetchStatus {
        FetchStatus::Success
    }
}

enum AttemptError {
    Transient(StatusCode),
    Terminal(NetworkError),
}

/// Performs logical GETs, retrying 429/502/503 with exponential backoff.
///
/// Transport failures and every other non-success status are terminal and
/// returned immediately.
#[derive(Clone)]
pub struct ResourceFetcher {
    transport: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
}

impl ResourceFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            policy: RetryPolicy::backoff(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetches `url`, retrying transient server conditions
    pub async fn fetch(&self, url: &str) -> NetworkResult<FetchOutcome> {
        let result = with_retry(
            &self.policy,
            |attempt| self.attempt(url, attempt),
            |error| matches!(error, AttemptError::Transient(_)),
        )
        .await;

        match result {
            Ok(done) => {
                log::debug!("Fetched {} in {} attempt(s)", redact(url), done.attempts);
                Ok(FetchOutcome {
                    attempts: done.attempts,
                    status: done.value.status,
                    body: done.value.body,
                })
            }
            Err(RetryFailure::Exhausted { error, attempts }) | Err(RetryFailure::Terminal { error, attempts }) => {
                let error = match error {
                    AttemptError::Transient(status) => NetworkError::RetriesExhausted {
                        status: status.as_u16(),
                        attempts,
                    },
                    AttemptError::Terminal(error) => error,
                };
                log::warn!("Fetch of {} failed: {}", redact(url), error);
                Err(error)
            }
            Err(RetryFailure::NoAttempts) => Err(NetworkError::MaxRetriesExceeded),
        }
    }

    /// Like [`fetch`](Self::fetch), aborting the request or backoff wait
    /// when `signal` is cancelled
    pub async fn fetch_with_cancel(&self, url: &str, signal: &CancelSignal) -> NetworkResult<FetchOutcome> {
        with_cancel(Some(signal), self.fetch(url)).await?
    }

    async fn attempt(&self, url: &str, attempt: usize) -> Result<HttpResponse, AttemptError> {
        let response = self.transport.get(url).await.map_err(AttemptError::Terminal)?;

        if is_transient_status(response.status) {
            log::warn!(
                "Attempt {} of {} got {}",
                attempt,
                self.policy.max_attempts(),
                response.status
            );
            return Err(AttemptError::Transient(response.status));
        }

        if !response.is_success() {
            return Err(AttemptError::Terminal(NetworkError::Status {
                status: response.status.as_u16(),
                reason: response.reason().to_string(),
            }));
        }

        Ok(response)
    }
}

/// Strips the query, which carries credentials, before a URL is logged
fn redact(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
