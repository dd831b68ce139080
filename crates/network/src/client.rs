// crates/network/src/client.rs
//! HTTP transport seam and its reqwest-backed implementation

use crate::error::{NetworkError, NetworkResult};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client as ReqwestClient, StatusCode};
use std::error::Error as _;
use std::time::Duration;

/// A fully read HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl HttpResponse {
    /// Creates a response from a raw status code, falling back to 500 for
    /// codes outside the valid range
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The canonical reason phrase for the status
    pub fn reason(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("Unknown")
    }
}

/// Performs a single HTTP GET.
///
/// Implementations report every received response, success or not, as `Ok`.
/// `Err` is reserved for requests that never got a response.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str) -> NetworkResult<HttpResponse>;
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Maximum redirects to follow
    pub max_redirects: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("sublink/{}", env!("CARGO_PKG_VERSION")),
            max_redirects: 10,
        }
    }
}

/// reqwest-backed [`HttpTransport`]
#[derive(Debug, Clone)]
pub struct Client {
    inner: ReqwestClient,
    config: ClientConfig,
}

impl Client {
    /// Creates a new client with default configuration
    pub fn new() -> NetworkResult<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Creates a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> NetworkResult<Self> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(NetworkError::Http)?;

        Ok(Self {
            inner: client,
            config,
        })
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl HttpTransport for Client {
    async fn get(&self, url: &str) -> NetworkResult<HttpResponse> {
        let response = self.inner.get(url).send().await.map_err(transport_error)?;
        let status = response.status();

        // Error bodies are not interpreted, only the status is.
        let body = if status.is_success() {
            response.bytes().await.map_err(transport_error)?
        } else {
            Bytes::new()
        };

        Ok(HttpResponse { status, body })
    }
}

/// Folds a reqwest failure into a transport error carrying the full cause chain
fn transport_error(err: reqwest::Error) -> NetworkError {
    if err.is_timeout() {
        return NetworkError::Timeout;
    }

    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    NetworkError::Transport(message)
}
