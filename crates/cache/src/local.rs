//! In-process TTL cache backed by DashMap for lock-free concurrent access.
//! Used on its own in single-node deployments and as L1 in front of Redis.

use crate::backend::CacheBackend;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

pub struct LocalCache {
    store: Arc<DashMap<String, CacheEntry>>,
    max_ttl: Duration,
    max_entries: usize,
}

impl LocalCache {
    /// `max_ttl_secs` caps every entry's lifetime regardless of the TTL passed to `put`.
    pub fn new(max_ttl_secs: u64, max_entries: usize) -> Self {
        Self {
            store: Arc::new(DashMap::with_capacity(max_entries.min(4096))),
            max_ttl: Duration::from_secs(max_ttl_secs),
            max_entries,
        }
    }

    /// Returns None if expired or missing.
    pub fn get_value(&self, key: &str) -> Option<String> {
        let entry = self.store.get(key)?;
        if Instant::now() >= entry.expires_at {
            drop(entry);
            self.store.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn put(&self, key: String, value: String, ttl: Duration) {
        // Simple eviction: if over capacity, skip insert (background cleanup handles this)
        if self.store.len() >= self.max_entries && !self.store.contains_key(&key) {
            metrics::counter!("cache.local.insert_skipped").increment(1);
            return;
        }
        self.store.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl.min(self.max_ttl),
            },
        );
    }

    pub fn remove(&self, key: &str) {
        self.store.remove(key);
    }

    /// Remove expired entries. Call this periodically from a background task.
    pub fn evict_expired(&self) -> usize {
        let before = self.store.len();
        let now = Instant::now();
        self.store.retain(|_, entry| now < entry.expires_at);
        before - self.store.len()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[async_trait]
impl CacheBackend for LocalCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.get_value(key))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> anyhow::Result<()> {
        self.put(key.to_string(), value, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.remove(key);
        Ok(())
    }

    async fn maintenance(&self) {
        let evicted = self.evict_expired();
        if evicted > 0 {
            tracing::debug!(evicted = evicted, "Local cache eviction complete");
        }
    }
}
