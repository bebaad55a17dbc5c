//! Cache store trait and write helpers
//!
//! The cache is advisory: read failures fall back to uncached behavior
//! and writes are fire-and-forget. A write deliberately ignores caller
//! cancellation so it can still warm the cache after a disconnect.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache backend error: {0}")]
    Backend(String),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Per-key side metadata stored alongside the value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl SideMetadata {
    pub fn new(title: Option<String>, description: Option<String>) -> Self {
        Self {
            title,
            description,
            timestamp: Utc::now(),
        }
    }
}

/// A cache hit: the stored value plus its side metadata
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: String,
    pub metadata: Option<SideMetadata>,
}

/// Trait for cache backends
///
/// Values are UTF-8 JSON strings; keys are opaque. Operations are atomic
/// at the key level; there are no cross-key transactions.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Looks up a key, returning the value and side metadata on a hit
    async fn get_with_metadata(&self, key: &str) -> CacheResult<Option<CacheEntry>>;

    /// Stores a value under a key with the given TTL
    async fn put(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        metadata: Option<SideMetadata>,
    ) -> CacheResult<()>;
}

/// Issues a cache write in the background with at-most-once retry
///
/// The caller never awaits the returned handle on the request path. The
/// retry waits a jittered backoff before the second attempt; a second
/// failure is logged and dropped.
pub fn spawn_put_with_retry(
    store: Arc<dyn CacheStore>,
    key: String,
    value: String,
    ttl: Duration,
    metadata: Option<SideMetadata>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match store.put(&key, &value, ttl, metadata.clone()).await {
            Ok(()) => return,
            Err(e) => {
                tracing::warn!("Cache put failed for {}: {}, retrying once", key, e);
            }
        }

        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..250));
        tokio::time::sleep(Duration::from_millis(500) + jitter).await;

        if let Err(e) = store.put(&key, &value, ttl, metadata).await {
            tracing::warn!("Cache put retry failed for {}: {}", key, e);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    #[tokio::test]
    async fn test_spawn_put_with_retry_writes() {
        let store: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
        let handle = spawn_put_with_retry(
            Arc::clone(&store),
            "k".to_string(),
            "v".to_string(),
            Duration::from_secs(60),
            Some(SideMetadata::new(Some("T".to_string()), None)),
        );

        handle.await.unwrap();

        let entry = store.get_with_metadata("k").await.unwrap().unwrap();
        assert_eq!(entry.value, "v");
        assert_eq!(entry.metadata.unwrap().title.as_deref(), Some("T"));
    }

    #[test]
    fn test_side_metadata_serde() {
        let metadata = SideMetadata::new(Some("T".to_string()), Some("D".to_string()));
        let json = serde_json::to_string(&metadata).unwrap();
        let back: SideMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(metadata, back);
    }
}
