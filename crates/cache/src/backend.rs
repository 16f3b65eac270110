//! Key-value cache contract shared by the tenant-metadata and analytics caches.

use async_trait::async_trait;
use std::time::Duration;

/// A get/set/delete store with per-entry time-to-live.
///
/// Implementations may fail (network, serialization); callers must treat a
/// failure as a miss and fall back to the source of truth.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> anyhow::Result<()>;

    async fn delete(&self, key: &str) -> anyhow::Result<()>;

    /// Periodic housekeeping. No-op unless the backend holds local state.
    async fn maintenance(&self) {}
}
