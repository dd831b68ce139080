// crates/network/src/cache_key.rs
//! Deriving artwork cache keys from request URLs

use url::Url;

const UNKNOWN_ID: &str = "unknown";
const DEFAULT_SIZE: &str = "default";
const ILLEGAL_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// The parts of an artwork URL that identify the image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeyComponents {
    pub id: String,
    pub size: String,
    /// Server timestamp (`_t`) that changes when the artwork changes
    pub cache_bust: Option<String>,
}

impl CacheKeyComponents {
    /// Reads `id`, `size` and `_t` from the URL's query.
    ///
    /// Missing or unparseable parts fall back to `unknown` and `default`.
    pub fn from_url(url: &str) -> Self {
        let mut id = None;
        let mut size = None;
        let mut cache_bust = None;

        if let Ok(parsed) = Url::parse(url) {
            for (key, value) in parsed.query_pairs() {
                if value.is_empty() {
                    continue;
                }
                let slot = match key.as_ref() {
                    "id" => &mut id,
                    "size" => &mut size,
                    "_t" => &mut cache_bust,
                    _ => continue,
                };
                if slot.is_none() {
                    *slot = Some(value.into_owned());
                }
            }
        }

        Self {
            id: id.unwrap_or_else(|| UNKNOWN_ID.to_string()),
            size: size.unwrap_or_else(|| DEFAULT_SIZE.to_string()),
            cache_bust,
        }
    }

    /// `{id}_{size}` plus `_{token}` when a cache-busting token is present,
    /// with filename-illegal characters replaced by `_`
    pub fn to_key(&self) -> String {
        let key = match &self.cache_bust {
            Some(token) => format!("{}_{}_{}", self.id, self.size, token),
            None => format!("{}_{}", self.id, self.size),
        };
        sanitize_file_name(&key)
    }
}

/// Replaces every character that is illegal in a file name with `_`
pub fn sanitize_file_name(raw: &str) -> String {
    raw.chars()
        .map(|ch| if ILLEGAL_FILENAME_CHARS.contains(&ch) { '_' } else { ch })
        .collect()
}

/// Cache key for an artwork URL
pub fn cache_key_for(url: &str) -> String {
    CacheKeyComponents::from_url(url).to_key()
}
