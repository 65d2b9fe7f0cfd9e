//! Request memoization keyed by a canonical request signature.
//!
//! The cache is a single flat JSON object (signature -> raw payload) that is read
//! once when loaded and rewritten wholesale after every miss. There is no eviction
//! and no expiry. A missing or unreadable document is treated as a cold cache.
//!
//! The cache is not safe for concurrent writers: two processes missing on the same
//! signature both hit the network and the last one to persist wins.

use crate::app::ports::{ApiRequest, HttpClientPort};
use crate::common::error::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Canonical signature of a request: the endpoint followed by its `key-value`
/// pairs in lexicographic key order, joined with `_`.
///
/// Parameter order never affects the result.
pub fn signature(endpoint: &str, params: &[(String, String)]) -> String {
    let mut pairs: Vec<&(String, String)> = params.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    let joined = pairs
        .iter()
        .map(|(k, v)| format!("{}-{}", k, v))
        .collect::<Vec<_>>()
        .join("_");
    format!("{}{}", endpoint, joined)
}

pub struct RequestCache {
    path: PathBuf,
    entries: BTreeMap<String, Value>,
}

impl RequestCache {
    /// Load the cache document at `path`. Never fails: anything unreadable
    /// starts an empty cache that will overwrite the file on the first miss.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<BTreeMap<String, Value>>(&contents) {
                Ok(entries) => {
                    info!(path = %path.display(), entries = entries.len(), "Loaded request cache");
                    entries
                }
                Err(e) => {
                    warn!(path = %path.display(), "Cache document is corrupt, starting cold: {}", e);
                    crate::observability::metrics::cache::load_failed();
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No cache document yet");
                BTreeMap::new()
            }
            Err(e) => {
                warn!(path = %path.display(), "Cache document unreadable, starting cold: {}", e);
                crate::observability::metrics::cache::load_failed();
                BTreeMap::new()
            }
        };
        Self { path, entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, request: &ApiRequest) -> bool {
        self.entries
            .contains_key(&signature(&request.endpoint, &request.params))
    }

    /// Return the cached payload for `request`, or fetch it through `http`,
    /// store it, persist the whole document and then return it.
    ///
    /// A failed fetch stores nothing.
    pub fn fetch(&mut self, http: &dyn HttpClientPort, request: &ApiRequest) -> Result<Value> {
        let key = signature(&request.endpoint, &request.params);

        if let Some(payload) = self.entries.get(&key) {
            debug!(signature = %key, "Cache hit");
            crate::observability::metrics::cache::hit();
            return Ok(payload.clone());
        }

        debug!(signature = %key, "Cache miss, requesting upstream");
        crate::observability::metrics::cache::miss();
        let payload = http.get_json(request)?;
        self.entries.insert(key, payload.clone());
        self.flush()?;
        Ok(payload)
    }

    /// Rewrite the whole document. Goes through a sibling temp file so a crash
    /// mid-write leaves the previous document in place.
    pub fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let document = serde_json::to_string(&self.entries)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, document)?;
        fs::rename(&tmp, &self.path)?;
        crate::observability::metrics::cache::persisted();
        debug!(path = %self.path.display(), entries = self.entries.len(), "Persisted request cache");
        Ok(())
    }
}

/// A cache paired with the transport it falls back to. Source adapters take one
/// of these instead of reaching for any global state.
pub struct CachedFetcher<'a> {
    cache: &'a mut RequestCache,
    http: &'a dyn HttpClientPort,
}

impl<'a> CachedFetcher<'a> {
    pub fn new(cache: &'a mut RequestCache, http: &'a dyn HttpClientPort) -> Self {
        Self { cache, http }
    }

    pub fn fetch(&mut self, request: &ApiRequest) -> Result<Value> {
        self.cache.fetch(self.http, request)
    }

    pub fn cache(&self) -> &RequestCache {
        self.cache
    }
}
