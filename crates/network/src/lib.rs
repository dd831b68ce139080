// crates/network/src/lib.rs
//! Reliable requests to a media server on unreliable networks
//!
//! - [`RouteSelector`] picks which of two server addresses to use
//! - [`ResourceFetcher`] retries transient HTTP failures with backoff
//! - [`ApiClient`] performs structured calls and checks the response envelope
//! - [`ArtworkCache`] keeps downloaded artwork on disk, gated by a
//!   [`RequestThrottler`](sublink_resilience::RequestThrottler)

mod api;
mod artwork_cache;
pub mod cache_key;
mod client;
mod connectivity;
mod error;
mod fetcher;
pub mod request;
mod response;
mod route;

pub use api::ApiClient;
pub use artwork_cache::{
    format_file_size, Artwork, ArtworkCache, ArtworkSource, CacheEntry, DEFAULT_EXPIRATION_DAYS,
};
pub use cache_key::CacheKeyComponents;
pub use client::{Client, ClientConfig, HttpResponse, HttpTransport};
pub use connectivity::{ConnectionCategory, ConnectivityMonitor, FixedNetworkProbe, NetworkTypeProbe};
pub use error::{FetchStatus, NetworkError, NetworkResult};
pub use fetcher::{is_transient_status, FetchOutcome, ResourceFetcher};
pub use request::{ApiRequest, Credentials, ImageSize};
pub use response::{ResponseStatus, SubsonicResponse};
pub use route::{
    EndpointCandidate, EndpointCandidates, EndpointRole, RoutePolicy, RouteSelectionResult,
    RouteSelector, ALL_ROUTES_FAILED, CONNECTION_TIMEOUT, NO_URLS_CONFIGURED, PING_FAILED,
    SELECTION_CANCELLED,
};
