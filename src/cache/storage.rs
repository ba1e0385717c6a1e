//! Persistent cache storage.
//!
//! # Responsibilities
//! - Manage named caches (open on first use, reuse thereafter)
//! - Store URL-keyed response entries, most-recent-value-wins
//! - Enforce per-cache byte capacity, surfacing `QuotaExceeded`
//! - Persist each cache to a JSON file so entries survive restarts
//!
//! # Design Decisions
//! - Entries are idempotent artifacts keyed by URL; concurrent writers
//!   race safely under last-write-wins, no locking across entries
//! - Persistence writes the whole map per mutation; caches are small and
//!   a torn process loses at most the in-flight write

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, GatewayResult};
use crate::http::request::GatewayRequest;
use crate::http::response::GatewayResponse;

/// Options for a cache lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchOptions {
    /// Ignore the URL query string when comparing keys.
    pub ignore_search: bool,
}

/// A stored response entry, serialized to disk as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl StoredEntry {
    fn from_response(response: &GatewayResponse) -> Self {
        Self {
            status: response.status().as_u16(),
            headers: response
                .headers()
                .iter()
                .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
                .collect(),
            body: response.body().to_vec(),
        }
    }

    fn to_response(&self) -> GatewayResponse {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (name.parse::<axum::http::HeaderName>(), value.parse())
            {
                headers.insert(name, value);
            }
        }
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        GatewayResponse::new(status, headers, Bytes::from(self.body.clone()))
    }

    fn byte_size(&self, key: &str) -> u64 {
        let header_bytes: usize = self.headers.iter().map(|(k, v)| k.len() + v.len()).sum();
        (key.len() + header_bytes + self.body.len()) as u64
    }
}

/// A single named cache.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Look up the entry for the request's URL.
    async fn match_request(
        &self,
        request: &GatewayRequest,
        options: &MatchOptions,
    ) -> GatewayResult<Option<GatewayResponse>>;

    /// Store (or overwrite) the entry for the request's URL.
    async fn put(
        &self,
        request: &GatewayRequest,
        response: &GatewayResponse,
    ) -> GatewayResult<()>;

    /// Remove the entry for the request's URL. Returns whether it existed.
    async fn delete(&self, request: &GatewayRequest) -> GatewayResult<bool>;

    /// All stored keys, sorted.
    async fn keys(&self) -> GatewayResult<Vec<String>>;
}

/// Factory for named caches: the persistent-store collaborator boundary.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    async fn open(&self, name: &str) -> GatewayResult<Arc<dyn Cache>>;
}

/// Disk-backed [`CacheStorage`] implementation.
///
/// With no directory configured the caches are memory-only, which the tests
/// rely on. Each named cache gets its own `<name>.json` file.
pub struct DiskCacheStorage {
    directory: Option<PathBuf>,
    default_capacity: Option<u64>,
    capacities: HashMap<String, u64>,
    caches: DashMap<String, Arc<DiskCache>>,
}

impl DiskCacheStorage {
    pub fn new(directory: Option<PathBuf>, default_capacity: Option<u64>) -> Self {
        Self {
            directory,
            default_capacity,
            capacities: HashMap::new(),
            caches: DashMap::new(),
        }
    }

    /// Memory-only storage with no capacity limits.
    pub fn in_memory() -> Self {
        Self::new(None, None)
    }

    /// Override the byte capacity of one named cache.
    pub fn with_capacity(mut self, name: impl Into<String>, capacity_bytes: u64) -> Self {
        self.capacities.insert(name.into(), capacity_bytes);
        self
    }
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn open(&self, name: &str) -> GatewayResult<Arc<dyn Cache>> {
        if let Some(existing) = self.caches.get(name) {
            return Ok(existing.value().clone());
        }

        let capacity = self
            .capacities
            .get(name)
            .copied()
            .or(self.default_capacity);
        let path = self.directory.as_ref().map(|dir| dir.join(format!("{}.json", name)));
        let cache = Arc::new(DiskCache::load(name.to_string(), path, capacity).await?);

        // Two tasks racing to open the same cache keep the first insert.
        let entry = self
            .caches
            .entry(name.to_string())
            .or_insert(cache)
            .value()
            .clone();
        Ok(entry)
    }
}

/// One named cache: an in-memory map mirrored to a JSON file.
struct DiskCache {
    name: String,
    path: Option<PathBuf>,
    capacity: Option<u64>,
    entries: DashMap<String, StoredEntry>,
    bytes_used: AtomicU64,
}

impl DiskCache {
    async fn load(name: String, path: Option<PathBuf>, capacity: Option<u64>) -> GatewayResult<Self> {
        let entries = DashMap::new();
        let mut bytes_used = 0u64;

        if let Some(path) = &path {
            if path.exists() {
                let raw = tokio::fs::read(path)
                    .await
                    .map_err(|e| GatewayError::Storage(e.to_string()))?;
                let map: HashMap<String, StoredEntry> = serde_json::from_slice(&raw)
                    .map_err(|e| GatewayError::Storage(e.to_string()))?;
                for (key, entry) in map {
                    bytes_used += entry.byte_size(&key);
                    entries.insert(key, entry);
                }
                tracing::info!(
                    cache = %name,
                    entries = entries.len(),
                    bytes = bytes_used,
                    "Cache loaded from disk"
                );
            }
        }

        Ok(Self {
            name,
            path,
            capacity,
            entries,
            bytes_used: AtomicU64::new(bytes_used),
        })
    }

    async fn persist(&self) -> GatewayResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let map: HashMap<String, StoredEntry> = self
            .entries
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        let raw = serde_json::to_vec(&map).map_err(|e| GatewayError::Storage(e.to_string()))?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| GatewayError::Storage(e.to_string()))?;
        }
        tokio::fs::write(path, raw)
            .await
            .map_err(|e| GatewayError::Storage(e.to_string()))
    }
}

#[async_trait]
impl Cache for DiskCache {
    async fn match_request(
        &self,
        request: &GatewayRequest,
        options: &MatchOptions,
    ) -> GatewayResult<Option<GatewayResponse>> {
        if let Some(entry) = self.entries.get(request.cache_key()) {
            return Ok(Some(entry.to_response()));
        }

        if options.ignore_search {
            let wanted = request.cache_key_ignoring_search();
            let mut candidates: Vec<String> = self
                .entries
                .iter()
                .map(|r| r.key().clone())
                .filter(|key| {
                    key.split('?').next().map(str::to_string).unwrap_or_default() == wanted
                })
                .collect();
            candidates.sort();
            if let Some(key) = candidates.first() {
                if let Some(entry) = self.entries.get(key) {
                    return Ok(Some(entry.to_response()));
                }
            }
        }

        Ok(None)
    }

    async fn put(&self, request: &GatewayRequest, response: &GatewayResponse) -> GatewayResult<()> {
        let key = request.cache_key().to_string();
        let entry = StoredEntry::from_response(response);
        let new_size = entry.byte_size(&key);
        let old_size = self
            .entries
            .get(&key)
            .map(|e| e.byte_size(&key))
            .unwrap_or(0);

        if let Some(capacity) = self.capacity {
            let projected = self.bytes_used.load(Ordering::SeqCst) - old_size + new_size;
            if projected > capacity {
                return Err(GatewayError::QuotaExceeded {
                    cache_name: self.name.clone(),
                    url: key,
                });
            }
        }

        self.entries.insert(key, entry);
        if new_size >= old_size {
            self.bytes_used
                .fetch_add(new_size - old_size, Ordering::SeqCst);
        } else {
            self.bytes_used
                .fetch_sub(old_size - new_size, Ordering::SeqCst);
        }
        self.persist().await
    }

    async fn delete(&self, request: &GatewayRequest) -> GatewayResult<bool> {
        let key = request.cache_key();
        let removed = self.entries.remove(key);
        if let Some((key, entry)) = &removed {
            self.bytes_used
                .fetch_sub(entry.byte_size(key), Ordering::SeqCst);
            self.persist().await?;
        }
        Ok(removed.is_some())
    }

    async fn keys(&self) -> GatewayResult<Vec<String>> {
        let mut keys: Vec<String> = self.entries.iter().map(|r| r.key().clone()).collect();
        keys.sort();
        Ok(keys)
    }
}
