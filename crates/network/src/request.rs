// crates/network/src/request.rs
//! Building authenticated server request URLs

use crate::error::{NetworkError, NetworkResult};
use url::Url;

/// Client identifier sent with every request
pub const CLIENT_ID: &str = "sublink";

/// REST API version this client speaks
pub const API_VERSION: &str = "1.13.0";

/// Bundled image shown when no artwork is available
pub const COVER_ART_PLACEHOLDER: &str = "/Assets/CoverArtPlaceholder.jpg";

const ENCODED_PASSWORD_PREFIX: &str = "enc:";

/// Username and password for the media server
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The password in the server's `enc:<hex>` form.
    ///
    /// Passwords that already carry the prefix are passed through unchanged.
    pub fn encoded_password(&self) -> String {
        if self.password.starts_with(ENCODED_PASSWORD_PREFIX) {
            self.password.clone()
        } else {
            format!("{}{}", ENCODED_PASSWORD_PREFIX, hex::encode(self.password.as_bytes()))
        }
    }
}

// Keeps passwords out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Artwork size variants requested from the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    Thumbnail,
    Original,
}

impl ImageSize {
    /// Edge length in pixels
    pub fn pixels(&self) -> u32 {
        match self {
            ImageSize::Thumbnail => 100,
            ImageSize::Original => 300,
        }
    }
}

/// A REST method call with its method-specific parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    method: String,
    params: Vec<(String, String)>,
}

impl ApiRequest {
    /// Creates a call to `method` (without the `.view` suffix)
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: Vec::new(),
        }
    }

    /// Appends a parameter. Repeated keys are kept, in order.
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

/// `{base}/rest/{view}.view` with any trailing slash on `base` removed
fn endpoint(base_url: &str, view: &str) -> NetworkResult<Url> {
    let base = base_url.trim().trim_end_matches('/');
    if base.is_empty() {
        return Err(NetworkError::InvalidUrl("empty base URL".to_string()));
    }

    Url::parse(&format!("{}/rest/{}.view", base, view))
        .map_err(|e| NetworkError::InvalidUrl(format!("{}: {}", base_url, e)))
}

/// Minimal authenticated reachability probe URL
pub fn ping_url(base_url: &str, credentials: &Credentials) -> NetworkResult<Url> {
    let mut url = endpoint(base_url, "ping")?;
    url.query_pairs_mut()
        .append_pair("u", &credentials.username)
        .append_pair("p", &credentials.encoded_password())
        .append_pair("c", CLIENT_ID)
        .append_pair("v", API_VERSION);
    Ok(url)
}

/// URL for a structured (XML) API call
pub fn api_url(base_url: &str, credentials: &Credentials, request: &ApiRequest) -> NetworkResult<Url> {
    let mut url = endpoint(base_url, &request.method)?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("u", &credentials.username)
            .append_pair("p", &credentials.encoded_password())
            .append_pair("v", API_VERSION)
            .append_pair("c", CLIENT_ID)
            .append_pair("f", "xml");
        for (key, value) in &request.params {
            query.append_pair(key, value);
        }
    }
    Ok(url)
}

/// Artwork URL for `cover_id`, or the placeholder path when there is no cover
pub fn cover_art_url(
    base_url: &str,
    credentials: &Credentials,
    cover_id: &str,
    size: ImageSize,
) -> NetworkResult<String> {
    if cover_id.trim().is_empty() {
        return Ok(COVER_ART_PLACEHOLDER.to_string());
    }

    let request = ApiRequest::new("getCoverArt")
        .param("id", cover_id)
        .param("size", size.pixels());
    Ok(api_url(base_url, credentials, &request)?.into())
}

/// Streaming URL for a song.
///
/// Compatible mode asks the server to transcode to 320 kbps MP3 for players
/// that cannot handle lossless formats.
pub fn stream_url(
    base_url: &str,
    credentials: &Credentials,
    song_id: &str,
    compatible_mode: bool,
) -> NetworkResult<Url> {
    let mut request = ApiRequest::new("stream").param("id", song_id);
    if compatible_mode {
        request = request.param("format", "mp3").param("maxBitRate", 320);
    }
    api_url(base_url, credentials, &request)
}
