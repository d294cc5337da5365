//! Last-known-position cache.
//!
//! The cache maps a user identifier to the most recently accepted position
//! for that user. It is the only shared mutable state between partition
//! workers and is accessed without client-side locking; per-user consistency
//! comes from partition affinity upstream, not from this layer.
//!
//! Failures are surfaced to the caller, never swallowed: a failed `set`
//! leaves cache and emitted-event state inconsistent, so the batch must be
//! retried.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::model::CachedLocation;

/// Key-value store of each user's last recorded position.
#[async_trait]
pub trait LocationCache: Send + Sync {
    /// Return the last recorded position for the user, or `None` if the user
    /// has never been seen.
    async fn get(&self, user_id: &str) -> Result<Option<CachedLocation>>;

    /// Unconditionally overwrite the stored position for the user.
    async fn set(&self, user_id: &str, location: &CachedLocation) -> Result<()>;
}

#[async_trait]
impl<C: LocationCache + ?Sized> LocationCache for Arc<C> {
    async fn get(&self, user_id: &str) -> Result<Option<CachedLocation>> {
        (**self).get(user_id).await
    }

    async fn set(&self, user_id: &str, location: &CachedLocation) -> Result<()> {
        (**self).set(user_id, location).await
    }
}

/// In-process cache backed by a `HashMap`. Used by tests and local runs.
#[derive(Debug, Default)]
pub struct MemoryLocationCache {
    entries: RwLock<HashMap<String, CachedLocation>>,
}

impl MemoryLocationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users currently tracked.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl LocationCache for MemoryLocationCache {
    async fn get(&self, user_id: &str) -> Result<Option<CachedLocation>> {
        Ok(self.entries.read().await.get(user_id).cloned())
    }

    async fn set(&self, user_id: &str, location: &CachedLocation) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(user_id.to_string(), location.clone());
        Ok(())
    }
}

/// Redis-backed cache. Key = user id, value = JSON-encoded [`CachedLocation`].
///
/// Retention is optional and defaults to none: entries never expire, so the
/// cache preserves "last known" semantics indefinitely. Growth is bounded
/// only by user cardinality, a documented operational property. Deployments
/// that need bounded growth can set a per-key TTL instead.
#[derive(Clone)]
pub struct RedisLocationCache {
    conn: ConnectionManager,
    retention: Option<Duration>,
}

impl RedisLocationCache {
    /// Connect to the cache endpoint. The connection manager reconnects
    /// automatically on transient failures.
    pub async fn connect(host: &str, port: u16, retention: Option<Duration>) -> Result<Self> {
        let client = redis::Client::open(format!("redis://{host}:{port}"))?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn, retention })
    }
}

#[async_trait]
impl LocationCache for RedisLocationCache {
    async fn get(&self, user_id: &str) -> Result<Option<CachedLocation>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(user_id).await?;
        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, user_id: &str, location: &CachedLocation) -> Result<()> {
        let json = serde_json::to_string(location)?;
        let mut conn = self.conn.clone();
        match self.retention {
            Some(ttl) => {
                let _: () = conn.set_ex(user_id, json, ttl.as_secs()).await?;
            }
            None => {
                let _: () = conn.set(user_id, json).await?;
            }
        }
        Ok(())
    }
}
