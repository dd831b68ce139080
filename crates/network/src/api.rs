// crates/network/src/api.rs
//! Structured API calls against the selected server

use crate::error::NetworkResult;
use crate::fetcher::ResourceFetcher;
use crate::request::{self, api_url, ApiRequest, Credentials, ImageSize};
use crate::response::SubsonicResponse;
use sublink_resilience::{with_cancel, CancelSignal};
use url::Url;

/// Client for one session: a base URL chosen by route selection plus the
/// user's credentials.
///
/// Calls go through the retrying fetcher and the response envelope check.
/// They are not throttled; only artwork downloads are.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    credentials: Credentials,
    fetcher: ResourceFetcher,
    compatible_mode: bool,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, credentials: Credentials, fetcher: ResourceFetcher) -> Self {
        Self {
            base_url: base_url.into(),
            credentials,
            fetcher,
            compatible_mode: false,
        }
    }

    /// Request transcoded MP3 streams for players without lossless support
    pub fn with_compatible_mode(mut self, enabled: bool) -> Self {
        self.compatible_mode = enabled;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn compatible_mode(&self) -> bool {
        self.compatible_mode
    }

    /// Performs `request` and checks the response envelope.
    ///
    /// Transport, status and retry failures come from the fetcher; a
    /// `failed` envelope is [`NetworkError::Application`](crate::NetworkError::Application).
    pub async fn call(&self, request: &ApiRequest) -> NetworkResult<SubsonicResponse> {
        let url = api_url(&self.base_url, &self.credentials, request)?;
        log::debug!("Calling {}", request.method());

        let outcome = self.fetcher.fetch(url.as_str()).await?;
        SubsonicResponse::parse(outcome.body)
    }

    /// Like [`call`](Self::call), aborting when `signal` is cancelled
    pub async fn call_with_cancel(
        &self,
        request: &ApiRequest,
        signal: &CancelSignal,
    ) -> NetworkResult<SubsonicResponse> {
        with_cancel(Some(signal), self.call(request)).await?
    }

    /// Checks that the server accepts the credentials
    pub async fn ping(&self) -> NetworkResult<bool> {
        let response = self.call(&ApiRequest::new("ping")).await?;
        log::info!("Server at {} speaks API {}", self.base_url, response.version());
        Ok(response.is_ok())
    }

    /// Artwork URL for `cover_id`, or the placeholder path for an empty id
    pub fn cover_art_url(&self, cover_id: &str, size: ImageSize) -> NetworkResult<String> {
        request::cover_art_url(&self.base_url, &self.credentials, cover_id, size)
    }

    /// Streaming URL for `song_id`, honoring compatible mode
    pub fn stream_url(&self, song_id: &str) -> NetworkResult<Url> {
        request::stream_url(&self.base_url, &self.credentials, song_id, self.compatible_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{HttpResponse, HttpTransport};
    use crate::error::NetworkError;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct Canned {
        status: u16,
        body: &'static str,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl HttpTransport for Canned {
        async fn get(&self, url: &str) -> NetworkResult<HttpResponse> {
            self.seen.lock().expect("lock").push(url.to_string());
            Ok(HttpResponse::new(self.status, self.body))
        }
    }

    fn client(status: u16, body: &'static str) -> (ApiClient, Arc<Canned>) {
        let transport = Arc::new(Canned {
            status,
            body,
            seen: Mutex::new(Vec::new()),
        });
        let fetcher = ResourceFetcher::new(transport.clone());
        let client = ApiClient::new("http://server:4040/", Credentials::new("alice", "pw"), fetcher);
        (client, transport)
    }

    #[tokio::test]
    async fn test_ping_ok() {
        let (client, transport) = client(200, r#"<subsonic-response status="ok" version="1.16.1"/>"#);
        assert!(client.ping().await.expect("ping"));

        let seen = transport.seen.lock().expect("lock");
        assert_eq!(seen.len(), 1);
        assert!(seen[0].starts_with("http://server:4040/rest/ping.view?"));
        assert!(seen[0].contains("f=xml"));
    }

    #[tokio::test]
    async fn test_call_surfaces_application_error() {
        let (client, _) = client(
            200,
            r#"<subsonic-response status="failed" version="1.16.1"><error code="70" message="Album not found"/></subsonic-response>"#,
        );

        let result = client.call(&ApiRequest::new("getAlbum").param("id", "x")).await;
        match result {
            Err(NetworkError::Application { code, message }) => {
                assert_eq!(code, 70);
                assert_eq!(message, "Album not found");
            }
            other => panic!("expected application error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_call_surfaces_status_error() {
        let (client, _) = client(404, "");
        let error = client.call(&ApiRequest::new("getAlbum")).await.expect_err("404");
        assert_eq!(error.to_string(), "Response was: status code 404, reason: Not Found");
    }

    #[tokio::test]
    async fn test_call_cancelled() {
        let (client, _) = client(200, r#"<subsonic-response status="ok" version="1.16.1"/>"#);
        let signal = CancelSignal::new();
        signal.cancel();

        let result = client.call_with_cancel(&ApiRequest::new("ping"), &signal).await;
        assert!(matches!(result, Err(NetworkError::Cancelled)));
    }

    #[test]
    fn test_url_helpers_use_session_settings() {
        let (client, _) = client(200, "");
        let client = client.with_compatible_mode(true);

        let stream = client.stream_url("song-1").expect("stream url");
        assert!(stream.as_str().starts_with("http://server:4040/rest/stream.view?"));
        assert!(stream.as_str().contains("maxBitRate=320"));

        let cover = client.cover_art_url("al-1", ImageSize::Thumbnail).expect("cover url");
        assert!(cover.contains("size=100"));
    }
}
