//! Redis-backed key/value store.
//!
//! Optional remote synced tier (feature `redis-storage`), letting admission
//! history follow an actor across devices and app instances. Values are the
//! same JSON documents the other tiers hold, stored under a configurable key
//! prefix.
//!
//! Every operation runs under a short timeout. The tiered store treats a
//! timeout like any other tier failure and falls through to the local tier,
//! so a slow or unreachable Redis costs at most `op_timeout` per admission
//! decision before its circuit opens.
//!
//! The sync `KeyValueStore` port is bridged to async Redis the same way in
//! both directions: inside a tokio runtime via `block_in_place`, outside one
//! via a throwaway runtime.

use crate::application::ports::{KeyValueStore, StoreError};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Configuration for the Redis tier.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Prefix prepended to every key (default: "order_throttle:")
    pub key_prefix: String,
    /// Per-operation timeout (default: 300ms)
    pub op_timeout: Duration,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            key_prefix: "order_throttle:".to_string(),
            op_timeout: Duration::from_millis(300),
        }
    }
}

/// Redis-backed store for cross-device admission history.
pub struct RedisStore {
    connection: Arc<RwLock<ConnectionManager>>,
    config: RedisStoreConfig,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Clone for RedisStore {
    fn clone(&self) -> Self {
        Self {
            connection: Arc::clone(&self.connection),
            config: self.config.clone(),
        }
    }
}

impl RedisStore {
    /// Connect with default configuration.
    ///
    /// # Errors
    /// Returns error if the connection cannot be established.
    pub async fn connect(url: &str) -> Result<Self, RedisError> {
        Self::connect_with_config(url, RedisStoreConfig::default()).await
    }

    /// Connect with custom configuration.
    ///
    /// # Errors
    /// Returns error if the connection cannot be established.
    pub async fn connect_with_config(
        url: &str,
        config: RedisStoreConfig,
    ) -> Result<Self, RedisError> {
        let client = Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;

        Ok(Self {
            connection: Arc::new(RwLock::new(connection)),
            config,
        })
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }

    async fn get_async(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = self.prefixed(key);
        let op = async {
            let mut conn = self.connection.write().await;
            conn.get::<_, Option<String>>(&key).await
        };
        match tokio::time::timeout(self.config.op_timeout, op).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StoreError::Backend(e.to_string())),
            Err(_) => Err(StoreError::Timeout),
        }
    }

    async fn set_async(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let key = self.prefixed(key);
        let op = async {
            let mut conn = self.connection.write().await;
            conn.set::<_, _, ()>(&key, value).await
        };
        match tokio::time::timeout(self.config.op_timeout, op).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(StoreError::Backend(e.to_string())),
            Err(_) => Err(StoreError::Timeout),
        }
    }

    fn block_on<F, R>(&self, fut: F) -> Result<R, StoreError>
    where
        F: std::future::Future<Output = Result<R, StoreError>>,
    {
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            tokio::task::block_in_place(|| handle.block_on(fut))
        } else {
            let rt = tokio::runtime::Runtime::new()
                .map_err(|e| StoreError::Backend(format!("tokio runtime: {e}")))?;
            rt.block_on(fut)
        }
    }
}

impl KeyValueStore for RedisStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.block_on(self.get_async(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.block_on(self.set_async(key, value))
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
