// crates/network/src/artwork_cache.rs
//! Disk cache for downloaded artwork
//!
//! Images are stored as `{root}/{key}.jpg`, where the key comes from the
//! artwork URL (see [`crate::cache_key`]). A miss goes through the request
//! throttler and the retrying fetcher; any failure degrades to the
//! placeholder image instead of an error.

use crate::cache_key::cache_key_for;
use crate::error::{NetworkError, NetworkResult};
use crate::fetcher::ResourceFetcher;
use crate::request::COVER_ART_PLACEHOLDER;
use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use image::DynamicImage;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use sublink_resilience::{with_cancel, CancelSignal, RequestThrottler};
use tempfile::NamedTempFile;

/// Entries older than this many days are removed by a default sweep
pub const DEFAULT_EXPIRATION_DAYS: u32 = 7;

const CACHE_EXTENSION: &str = "jpg";
const BUNDLED_ASSET_PREFIX: &str = "/Assets";

/// Where a returned image came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtworkSource {
    Cache,
    Network,
}

/// Result of an artwork lookup
#[derive(Debug, Clone)]
pub enum Artwork {
    Image {
        /// The encoded bytes as stored on disk
        bytes: Bytes,
        image: Arc<DynamicImage>,
        source: ArtworkSource,
    },
    /// No image could be produced; show the bundled placeholder
    Placeholder { path: PathBuf },
}

impl Artwork {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Artwork::Placeholder { .. })
    }

    pub fn bytes(&self) -> Option<&Bytes> {
        match self {
            Artwork::Image { bytes, .. } => Some(bytes),
            Artwork::Placeholder { .. } => None,
        }
    }

    pub fn source(&self) -> Option<ArtworkSource> {
        match self {
            Artwork::Image { source, .. } => Some(*source),
            Artwork::Placeholder { .. } => None,
        }
    }
}

/// A persisted artwork file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
}

#[derive(Clone)]
struct Downloaded {
    bytes: Bytes,
    image: Arc<DynamicImage>,
    source: ArtworkSource,
}

type DownloadResult = Result<Downloaded, Arc<NetworkError>>;
type SharedDownload = Shared<BoxFuture<'static, DownloadResult>>;

struct CacheInner {
    root: PathBuf,
    throttler: RequestThrottler,
    fetcher: ResourceFetcher,
    in_flight: Mutex<HashMap<String, WeakShared<BoxFuture<'static, DownloadResult>>>>,
}

/// Content-addressed, age-bounded artwork cache.
///
/// Clones share the same directory, throttler and in-flight downloads.
/// Concurrent requests for the same uncached key share one download.
#[derive(Clone)]
pub struct ArtworkCache {
    inner: Arc<CacheInner>,
    placeholder: PathBuf,
}

impl ArtworkCache {
    /// Opens (creating if needed) a cache rooted at `root`
    pub fn open(
        root: impl Into<PathBuf>,
        throttler: RequestThrottler,
        fetcher: ResourceFetcher,
    ) -> NetworkResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        log::debug!("Artwork cache at {}", root.display());

        Ok(Self {
            inner: Arc::new(CacheInner {
                root,
                throttler,
                fetcher,
                in_flight: Mutex::new(HashMap::new()),
            }),
            placeholder: PathBuf::from(COVER_ART_PLACEHOLDER),
        })
    }

    /// Overrides the path returned for placeholder artwork
    pub fn with_placeholder(mut self, path: impl Into<PathBuf>) -> Self {
        self.placeholder = path.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Path of the file that stores `key`
    pub fn path_for_key(&self, key: &str) -> PathBuf {
        self.inner.path_for_key(key)
    }

    /// Returns the artwork for `url`, from disk when cached.
    ///
    /// Never fails: empty URLs, bundled asset paths and every fetch, decode
    /// or storage failure produce [`Artwork::Placeholder`].
    pub async fn get(&self, url: &str) -> Artwork {
        let url = url.trim();
        if url.is_empty() || url.starts_with(BUNDLED_ASSET_PREFIX) {
            return self.placeholder();
        }

        let key = cache_key_for(url);
        let path = self.inner.path_for_key(&key);

        if let Some(artwork) = read_cached(&key, &path).await {
            return artwork;
        }

        match self.download(key.clone(), url).await {
            Ok(downloaded) => Artwork::Image {
                bytes: downloaded.bytes,
                image: downloaded.image,
                source: downloaded.source,
            },
            Err(e) => {
                log::warn!("Artwork {} unavailable, using placeholder: {}", key, e);
                self.placeholder()
            }
        }
    }

    /// Like [`get`](Self::get), giving up with the placeholder when `signal`
    /// is cancelled. A download nobody else is waiting for is abandoned and
    /// its throttle slot released.
    pub async fn get_with_cancel(&self, url: &str, signal: &CancelSignal) -> Artwork {
        match with_cancel(Some(signal), self.get(url)).await {
            Ok(artwork) => artwork,
            Err(_) => {
                log::debug!("Artwork request cancelled");
                self.placeholder()
            }
        }
    }

    /// Total on-disk size of all entries in bytes
    pub async fn size(&self) -> u64 {
        self.entries().await.iter().map(|entry| entry.size_bytes).sum()
    }

    /// Every cached file. Unreadable entries are skipped.
    pub async fn entries(&self) -> Vec<CacheEntry> {
        match self.inner.scan().await {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Could not list artwork cache {}: {}", self.inner.root.display(), e);
                Vec::new()
            }
        }
    }

    /// Deletes every entry. Returns how many were removed.
    pub async fn clear_all(&self) -> usize {
        let entries = self.entries().await;
        let removed = remove_entries(&entries).await;
        log::info!("Cleared {} artwork cache entries", removed);
        removed
    }

    /// Deletes entries last modified more than `max_age_days` ago.
    /// Returns how many were removed.
    ///
    /// An age reaching back past the earliest representable date expires
    /// nothing.
    pub async fn clean_expired(&self, max_age_days: u32) -> usize {
        let Some(cutoff) = TimeDelta::try_days(i64::from(max_age_days))
            .and_then(|age| Utc::now().checked_sub_signed(age))
        else {
            log::debug!("Expiration age of {} days predates any entry", max_age_days);
            return 0;
        };
        let expired: Vec<CacheEntry> = self
            .entries()
            .await
            .into_iter()
            .filter(|entry| entry.modified < cutoff)
            .collect();

        let removed = remove_entries(&expired).await;
        if removed > 0 {
            log::info!(
                "Removed {} artwork cache entries older than {} days",
                removed,
                max_age_days
            );
        }
        removed
    }

    fn placeholder(&self) -> Artwork {
        Artwork::Placeholder {
            path: self.placeholder.clone(),
        }
    }

    /// Joins the in-flight download for `key`, or starts one
    async fn download(&self, key: String, url: &str) -> DownloadResult {
        let shared: SharedDownload = {
            let mut in_flight = self.inner.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            let existing = in_flight.get(&key).and_then(WeakShared::upgrade);

            match existing {
                Some(existing) => {
                    log::debug!("Joining in-flight download of {}", key);
                    existing
                }
                None => {
                    in_flight.retain(|_, weak| weak.upgrade().is_some());

                    let download = CacheInner::fetch_and_store(
                        Arc::clone(&self.inner),
                        key.clone(),
                        url.to_string(),
                    )
                    .boxed()
                    .shared();
                    if let Some(weak) = download.downgrade() {
                        in_flight.insert(key, weak);
                    }
                    download
                }
            }
        };

        shared.await
    }
}

impl CacheInner {
    fn path_for_key(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.{}", key, CACHE_EXTENSION))
    }

    async fn fetch_and_store(inner: Arc<CacheInner>, key: String, url: String) -> DownloadResult {
        let result = inner.fetch_decode_persist(&key, &url).await;
        inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        result.map_err(Arc::new)
    }

    async fn fetch_decode_persist(&self, key: &str, url: &str) -> NetworkResult<Downloaded> {
        let path = self.path_for_key(key);

        // A download that finished after the caller's disk check has
        // already stored this key
        if let Some(Artwork::Image { bytes, image, source }) = read_cached(key, &path).await {
            return Ok(Downloaded { bytes, image, source });
        }

        let slot = self.throttler.acquire().await?;
        let outcome = self.fetcher.fetch(url).await?;
        log::trace!("Fetched {} holding a throttle slot for {:?}", key, slot.held_for());
        drop(slot);

        let image = decode(outcome.body.clone()).await?;

        persist(self.root.clone(), path.clone(), outcome.body.clone()).await?;
        log::debug!(
            "Cached artwork {} ({} bytes, {} attempt(s))",
            path.display(),
            outcome.body.len(),
            outcome.attempts
        );

        Ok(Downloaded {
            bytes: outcome.body,
            image: Arc::new(image),
            source: ArtworkSource::Network,
        })
    }

    async fn scan(&self) -> std::io::Result<Vec<CacheEntry>> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut entries = Vec::new();
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(CACHE_EXTENSION) {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|stem| stem.to_str()).map(str::to_string) else {
                continue;
            };

            let metadata = match item.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(e) => {
                    log::warn!("Skipping cache entry {}: {}", path.display(), e);
                    continue;
                }
            };
            let modified = match metadata.modified().or_else(|_| metadata.created()) {
                Ok(time) => DateTime::<Utc>::from(time),
                Err(e) => {
                    log::warn!("No timestamp for cache entry {}: {}", path.display(), e);
                    continue;
                }
            };

            entries.push(CacheEntry {
                key,
                path,
                size_bytes: metadata.len(),
                modified,
            });
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }
}

/// Loads a cached file. A file that no longer decodes is removed so the
/// caller falls through to a fresh download.
async fn read_cached(key: &str, path: &Path) -> Option<Artwork> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => Bytes::from(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            log::warn!("Could not read cached artwork {}: {}", path.display(), e);
            return None;
        }
    };

    match decode(bytes.clone()).await {
        Ok(image) => {
            log::trace!("Artwork cache hit for {}", key);
            Some(Artwork::Image {
                bytes,
                image: Arc::new(image),
                source: ArtworkSource::Cache,
            })
        }
        Err(e) => {
            log::warn!("Removing corrupt cache entry {}: {}", path.display(), e);
            if let Err(e) = tokio::fs::remove_file(path).await {
                log::warn!("Could not remove {}: {}", path.display(), e);
            }
            None
        }
    }
}

async fn decode(bytes: Bytes) -> NetworkResult<DynamicImage> {
    tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
        .await
        .map_err(|e| NetworkError::Decode(e.to_string()))?
        .map_err(|e| NetworkError::Decode(e.to_string()))
}

/// Writes `bytes` to a temp file in `root` and renames it over `path`, so
/// readers never see a partial file
async fn persist(root: PathBuf, path: PathBuf, bytes: Bytes) -> NetworkResult<()> {
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let mut file = NamedTempFile::new_in(&root)?;
        file.write_all(&bytes)?;
        file.as_file().sync_all()?;
        file.persist(&path).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| NetworkError::Io(std::io::Error::other(e)))?
    .map_err(NetworkError::from)
}

async fn remove_entries(entries: &[CacheEntry]) -> usize {
    let mut removed = 0;
    for entry in entries {
        match tokio::fs::remove_file(&entry.path).await {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Could not delete cache entry {}: {}", entry.path.display(), e),
        }
    }
    removed
}

/// Human-readable byte count, e.g. `0 B`, `1.5 KB`, `2.25 MB`
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rendered = format!("{:.2}", value);
    let trimmed = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
