//! Redis cache client shared by every API node.
//! Two-tier caching: LocalCache (L1) -> Redis (L2).

use crate::backend::CacheBackend;
use crate::local::LocalCache;
use adgenius_core::config::RedisConfig;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Redis-backed distributed cache with local L1 layer.
pub struct RedisCache {
    conn: ConnectionManager,
    local: Arc<LocalCache>,
}

impl RedisCache {
    pub async fn new(config: &RedisConfig) -> anyhow::Result<Self> {
        let url = config
            .urls
            .first()
            .cloned()
            .unwrap_or_else(|| "redis://localhost:6379".to_string());

        info!(url = %url, "Connecting to Redis");

        let client = redis::Client::open(url.as_str())?;
        let timeout = Duration::from_millis(config.connect_timeout_ms);
        let mut conn = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| anyhow::anyhow!("Redis connect timed out after {timeout:?}"))??;

        // Verify connectivity
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!(response = %pong, "Redis connection established");

        // L1 entries live at most 60s so other nodes' deletes are observed quickly.
        let local = Arc::new(LocalCache::new(60, 100_000));

        Ok(Self { conn, local })
    }

    pub fn local_cache_size(&self) -> usize {
        self.local.len()
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        if let Some(value) = self.local.get_value(key) {
            metrics::counter!("cache.l1.hit").increment(1);
            return Ok(Some(value));
        }
        metrics::counter!("cache.l1.miss").increment(1);

        let mut conn = self.conn.clone();
        let data: Option<String> = conn.get(key).await?;
        match data {
            Some(value) => {
                metrics::counter!("cache.l2.hit").increment(1);
                self.local
                    .put(key.to_string(), value.clone(), Duration::from_secs(60));
                Ok(Some(value))
            }
            None => {
                metrics::counter!("cache.l2.miss").increment(1);
                debug!(key = key, "Redis cache miss");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, &value, ttl.as_secs().max(1)).await?;
        self.local.put(key.to_string(), value, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.local.remove(key);
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn maintenance(&self) {
        let evicted = self.local.evict_expired();
        if evicted > 0 {
            debug!(evicted = evicted, "Local cache eviction complete");
        }
    }
}
