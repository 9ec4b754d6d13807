use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::{MatchResult, WeightConfig};

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache miss: {0}")]
    CacheMiss(String),
}

/// Multi-tier cache manager
///
/// L1 is an in-process `moka` cache, L2 is Redis shared across instances.
/// Stored match lists and the active weights are cached here; the store
/// stays authoritative.
pub struct CacheManager {
    redis: Arc<tokio::sync::Mutex<ConnectionManager>>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
    ttl_secs: u64,
}

impl CacheManager {
    /// Create a new cache manager
    pub async fn new(redis_url: &str, l1_size: u64, ttl_secs: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = redis::aio::ConnectionManager::new(client).await?;

        let l1_cache = moka::future::CacheBuilder::new(l1_size)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Ok(Self {
            redis: Arc::new(tokio::sync::Mutex::new(redis)),
            l1_cache,
            ttl_secs,
        })
    }

    /// Get a value from cache (L1 first, then L2)
    pub async fn get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let use_l1 = CacheKey::uses_l1(key);

        if use_l1 {
            if let Some(bytes) = self.l1_cache.get(key).await {
                tracing::trace!("L1 cache hit: {}", key);
                return Ok(serde_json::from_slice(&bytes)?);
            }
        }

        let mut conn = self.redis.lock().await;
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut *conn)
            .await?;
        drop(conn);

        if let Some(json) = value {
            tracing::trace!("L2 cache hit: {}", key);

            if use_l1 {
                let bytes = json.as_bytes().to_vec();
                self.l1_cache.insert(key.to_string(), bytes).await;
            }

            return Ok(serde_json::from_str(&json)?);
        }

        tracing::trace!("Cache miss: {}", key);
        Err(CacheError::CacheMiss(key.to_string()))
    }

    /// Set a value in cache (L2, and L1 unless the key is shared-only)
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize + ?Sized,
    {
        let json = serde_json::to_string(value)?;

        if CacheKey::uses_l1(key) {
            let bytes = json.as_bytes().to_vec();
            self.l1_cache.insert(key.to_string(), bytes).await;
        }

        let mut conn = self.redis.lock().await;
        redis::cmd("SETEX")
            .arg(key)
            .arg(self.ttl_secs)
            .arg(json)
            .query_async::<()>(&mut *conn)
            .await?;
        drop(conn);

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }

    /// Delete a value from both cache tiers
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1_cache.invalidate(key).await;
        let mut conn = self.redis.lock().await;
        redis::cmd("DEL")
            .arg(key)
            .query_async::<()>(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn get_match_results(&self, request_id: &str) -> Result<Vec<MatchResult>, CacheError> {
        self.get(&CacheKey::match_results(request_id)).await
    }

    /// Overwrite the cached list after a rematch
    pub async fn put_match_results(&self, request_id: &str, results: &[MatchResult]) -> Result<(), CacheError> {
        self.set(&CacheKey::match_results(request_id), results).await
    }

    pub async fn get_weights(&self) -> Result<WeightConfig, CacheError> {
        self.get(&CacheKey::weights()).await
    }

    pub async fn invalidate_weights(&self) -> Result<(), CacheError> {
        self.delete(&CacheKey::weights()).await
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            l1_size: self.l1_cache.entry_count(),
            ttl_secs: self.ttl_secs,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub l1_size: u64,
    pub ttl_secs: u64,
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Key for the stored ranked list of a request
    pub fn match_results(request_id: &str) -> String {
        format!("matches:{}", request_id)
    }

    /// Key for the active weight config
    pub fn weights() -> String {
        "weights:active".to_string()
    }

    /// Whether a key may be held in the per-instance L1 tier.
    ///
    /// The weights key lives in Redis only, so a save on one instance is
    /// seen by every instance as soon as it invalidates. Match lists may
    /// lag on other instances for up to the TTL after a rematch.
    pub fn uses_l1(key: &str) -> bool {
        key != Self::weights()
    }
}
