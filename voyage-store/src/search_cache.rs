use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, warn};

use voyage_core::{ProviderError, SearchProvider, SearchQuery};

use crate::redis_repo::RedisClient;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(#[from] redis::RedisError),
    #[error("Cached payload is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Key-value store for raw provider responses with a TTL
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, fingerprint: &str) -> Result<Option<String>, CacheError>;
    async fn put(&self, fingerprint: &str, payload: &str, ttl_seconds: u64) -> Result<(), CacheError>;
}

#[async_trait]
impl ResponseCache for RedisClient {
    async fn get(&self, fingerprint: &str) -> Result<Option<String>, CacheError> {
        Ok(self.get_cached_search(fingerprint).await?)
    }

    async fn put(&self, fingerprint: &str, payload: &str, ttl_seconds: u64) -> Result<(), CacheError> {
        Ok(self.cache_search(fingerprint, payload, ttl_seconds).await?)
    }
}

/// Stable digest of a search query, used as the cache key
pub fn query_fingerprint(query: &SearchQuery) -> String {
    let canonical = serde_json::to_string(query).unwrap_or_default();
    let digest = Sha256::digest(canonical.as_bytes());
    format!("{:x}", digest)
}

/// Search provider decorator that reuses recent raw batches.
///
/// Cache failures never fail the search; empty batches are not cached.
pub struct CachedSearchProvider {
    inner: Arc<dyn SearchProvider>,
    cache: Arc<dyn ResponseCache>,
    ttl_seconds: u64,
}

impl CachedSearchProvider {
    pub fn new(inner: Arc<dyn SearchProvider>, cache: Arc<dyn ResponseCache>, ttl_seconds: u64) -> Self {
        Self { inner, cache, ttl_seconds }
    }

    async fn lookup(&self, fingerprint: &str) -> Result<Option<Vec<Value>>, CacheError> {
        match self.cache.get(fingerprint).await? {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl SearchProvider for CachedSearchProvider {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Value>, ProviderError> {
        let fingerprint = query_fingerprint(query);

        match self.lookup(&fingerprint).await {
            Ok(Some(records)) => {
                debug!("Search cache hit for {} ({} records)", fingerprint, records.len());
                return Ok(records);
            }
            Ok(None) => {}
            Err(e) => warn!("Search cache read failed, querying provider: {}", e),
        }

        let records = self.inner.search(query).await?;

        if !records.is_empty() {
            match serde_json::to_string(&records) {
                Ok(payload) => {
                    if let Err(e) = self.cache.put(&fingerprint, &payload, self.ttl_seconds).await {
                        warn!("Search cache write failed: {}", e);
                    }
                }
                Err(e) => warn!("Search response not cacheable: {}", e),
            }
        }

        Ok(records)
    }
}
