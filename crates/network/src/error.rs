// crates/network/src/error.rs
//! Error types for network operations

use sublink_resilience::ResilienceError;
use thiserror::Error;

/// Result type for network operations
pub type NetworkResult<T> = Result<T, NetworkError>;

/// How a fetch sequence ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Success,
    /// Retryable server condition that outlasted the retry budget
    TransientFailure,
    TerminalFailure,
}

/// Errors that can occur during network operations
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Failed to build the HTTP client
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The request never produced an HTTP response (DNS, refused, TLS, ...)
    #[error("Could not perform HTTP request: {0}")]
    Transport(String),

    /// The server answered with a non-success status
    #[error("Response was: status code {status}, reason: {reason}")]
    Status { status: u16, reason: String },

    /// A retryable status persisted through every attempt
    #[error("Server returned {status} after {attempts} attempts")]
    RetriesExhausted { status: u16, attempts: usize },

    /// The retry loop ended without a response or error
    #[error("Max retries exceeded")]
    MaxRetriesExceeded,

    /// Timeout
    #[error("Operation timed out")]
    Timeout,

    /// The caller cancelled the operation
    #[error("Operation was cancelled")]
    Cancelled,

    /// The server processed the request but reported a failure in the body
    #[error("Server error {code}: {message}")]
    Application { code: u32, message: String },

    /// The response body is not a server response document
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Downloaded bytes are not a decodable image
    #[error("Image decode failed: {0}")]
    Decode(String),

    /// Resilience error
    #[error("Resilience error: {0}")]
    Resilience(ResilienceError),
}

impl From<ResilienceError> for NetworkError {
    fn from(err: ResilienceError) -> Self {
        match err {
            ResilienceError::Timeout(_) => NetworkError::Timeout,
            ResilienceError::Cancelled => NetworkError::Cancelled,
            other => NetworkError::Resilience(other),
        }
    }
}

impl From<quick_xml::Error> for NetworkError {
    fn from(err: quick_xml::Error) -> Self {
        NetworkError::InvalidResponse(err.to_string())
    }
}

impl NetworkError {
    /// Classifies how a fetch that failed with this error ended
    pub fn fetch_status(&self) -> FetchStatus {
        match self {
            NetworkError::RetriesExhausted { .. } => FetchStatus::TransientFailure,
            _ => FetchStatus::TerminalFailure,
        }
    }

    /// Returns true if the server rejected the request with a 4xx status
    pub fn is_client_error(&self) -> bool {
        matches!(self, NetworkError::Status { status, .. } if (400..500).contains(status))
    }

    /// Returns true if the server failed with a 5xx status
    pub fn is_server_error(&self) -> bool {
        match self {
            NetworkError::Status { status, .. } | NetworkError::RetriesExhausted { status, .. } => {
                (500..600).contains(status)
            }
            _ => false,
        }
    }
}
