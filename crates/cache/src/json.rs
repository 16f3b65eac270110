//! Typed JSON view over a [`CacheBackend`] that degrades every failure to a miss.

use crate::backend::CacheBackend;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct JsonCache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
}

impl JsonCache {
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Backend errors and undecodable payloads are reported as `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = key, "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(key = key, error = %e, "Cache read failed, falling back to store");
                metrics::counter!("cache.errors", "op" => "get").increment(1);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key = key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key = key, error = %e, "Discarding undecodable cache entry");
                let _ = self.backend.delete(key).await;
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = key, error = %e, "Cache encode failed");
                return;
            }
        };
        if let Err(e) = self.backend.set(key, raw, self.ttl).await {
            warn!(key = key, error = %e, "Cache write failed");
            metrics::counter!("cache.errors", "op" => "set").increment(1);
        }
    }

    pub async fn delete(&self, key: &str) {
        if let Err(e) = self.backend.delete(key).await {
            warn!(key = key, error = %e, "Cache delete failed");
            metrics::counter!("cache.errors", "op" => "delete").increment(1);
        }
    }
}
