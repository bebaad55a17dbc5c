//! In-memory cache backend
//!
//! A process-local map with per-entry TTL. This is the default backend
//! when no database path is configured, and the backend the unit tests
//! use.

use crate::cache::store::{CacheEntry, CacheResult, CacheStore, SideMetadata};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct StoredEntry {
    value: String,
    metadata: Option<SideMetadata>,
    expires_at: Instant,
}

impl StoredEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory TTL key-value store
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, StoredEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().expect("cache lock poisoned");
        entries.values().filter(|e| !e.is_expired()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get_with_metadata(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");

        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(CacheEntry {
                value: entry.value.clone(),
                metadata: entry.metadata.clone(),
            })),
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        metadata: Option<SideMetadata>,
    ) -> CacheResult<()> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(
            key.to_string(),
            StoredEntry {
                value: value.to_string(),
                metadata,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let cache = MemoryCache::new();
        cache
            .put("k", "v", Duration::from_secs(60), None)
            .await
            .unwrap();

        let entry = cache.get_with_metadata("k").await.unwrap().unwrap();
        assert_eq!(entry.value, "v");
        assert!(entry.metadata.is_none());
    }

    #[tokio::test]
    async fn test_miss() {
        let cache = MemoryCache::new();
        assert!(cache.get_with_metadata("absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite() {
        let cache = MemoryCache::new();
        cache
            .put("k", "v1", Duration::from_secs(60), None)
            .await
            .unwrap();
        cache
            .put("k", "v2", Duration::from_secs(60), None)
            .await
            .unwrap();

        let entry = cache.get_with_metadata("k").await.unwrap().unwrap();
        assert_eq!(entry.value, "v2");
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = MemoryCache::new();
        cache
            .put("k", "v", Duration::from_millis(0), None)
            .await
            .unwrap();

        assert!(cache.get_with_metadata("k").await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_metadata_round_trip() {
        let cache = MemoryCache::new();
        let metadata = SideMetadata::new(Some("Title".to_string()), None);
        cache
            .put("k", "v", Duration::from_secs(60), Some(metadata.clone()))
            .await
            .unwrap();

        let entry = cache.get_with_metadata("k").await.unwrap().unwrap();
        assert_eq!(entry.metadata, Some(metadata));
    }
}
