use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;

use crate::error::Result;

/// Storage behind the cache service. Implementations store opaque JSON
/// strings under namespaced keys with a per-entry TTL.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get_raw(&self, key: &str) -> Result<Option<String>>;
    async fn set_raw(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;
    async fn delete_raw(&self, key: &str) -> Result<()>;
}

pub struct RedisCache {
    conn: MultiplexedConnection,
}

impl RedisCache {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set_raw(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .set(key, value)
            .expire(key, ttl_secs as i64)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete_raw(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(())
    }
}

/// In-process fallback used when Redis is disabled or unreachable, and
/// by the test suite. Expired entries are dropped on read.
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((value, expires)) if *expires > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_raw(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let expires = Instant::now() + Duration::from_secs(ttl_secs);
        self.entries
            .lock()
            .await
            .insert(key.to_string(), (value.to_string(), expires));
        Ok(())
    }

    async fn delete_raw(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// Typed cache-aside layer over a [`CacheBackend`]. Backend failures are
/// logged and read as a miss, so services never fail on cache trouble.
pub struct CacheService {
    backend: Arc<dyn CacheBackend>,
    prefix: String,
}

impl CacheService {
    pub fn new(backend: Arc<dyn CacheBackend>, prefix: impl Into<String>) -> Self {
        Self {
            backend,
            prefix: prefix.into(),
        }
    }

    /// Joins key segments with `:`, e.g. `key(&["payment", id])` -> `payment:<id>`.
    pub fn key(&self, parts: &[&str]) -> String {
        parts.join(":")
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let full = self.namespaced(key);
        let raw = match self.backend.get_raw(&full).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Cache read for {} failed: {}", full, e);
                return None;
            }
        };
        raw.and_then(|json| serde_json::from_str(&json).ok())
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        let full = self.namespaced(key);
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Cache encode for {} failed: {}", full, e);
                return;
            }
        };
        if let Err(e) = self.backend.set_raw(&full, &json, ttl_secs).await {
            tracing::warn!("Cache write for {} failed: {}", full, e);
        }
    }

    pub async fn delete(&self, key: &str) {
        let full = self.namespaced(key);
        if let Err(e) = self.backend.delete_raw(&full).await {
            tracing::warn!("Cache delete for {} failed: {}", full, e);
        }
    }

    /// Returns the cached value, or runs `loader` and caches its result.
    /// Loader errors propagate; they are never cached.
    pub async fn get_or_set<T, F, Fut>(&self, key: &str, ttl_secs: u64, loader: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(cached) = self.get::<T>(key).await {
            return Ok(cached);
        }
        let value = loader().await?;
        self.set(key, &value, ttl_secs).await;
        Ok(value)
    }
}
