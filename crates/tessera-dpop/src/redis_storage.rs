//! Redis-backed replay store
//!
//! Shares replay state between verifier instances when the `redis-storage`
//! feature is enabled. Keys are written with `EX` so Redis expires them.

use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client, RedisResult};
use tracing::{debug, error, trace, warn};

use tessera_core::{Error, Result};

use crate::replay::ReplayStore;

/// Default key prefix for replay entries
pub const DEFAULT_KEY_PREFIX: &str = "tessera";

/// Redis replay store
#[derive(Debug, Clone)]
pub struct RedisReplayStore {
    /// Redis client for async operations
    client: Client,

    /// Key prefix for replay entries
    replay_prefix: String,

    /// Maximum number of attempts per Redis operation
    max_retries: u32,
}

impl RedisReplayStore {
    /// Connect with the default key prefix
    ///
    /// # Errors
    /// Returns [`Error::Storage`] if Redis is unreachable
    pub async fn new(connection_string: &str) -> Result<Self> {
        Self::with_config(connection_string, DEFAULT_KEY_PREFIX).await
    }

    /// Connect with a custom key prefix
    ///
    /// # Errors
    /// Returns [`Error::Storage`] if Redis is unreachable
    pub async fn with_config(connection_string: &str, key_prefix: &str) -> Result<Self> {
        let client = Client::open(connection_string).map_err(|e| Error::Storage {
            reason: format!("Failed to create Redis client: {e}"),
        })?;

        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::Storage {
                reason: format!("Failed to connect to Redis: {e}"),
            })?;

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Storage {
                reason: format!("Redis ping failed: {e}"),
            })?;

        debug!("Redis connection established successfully");

        Ok(Self {
            client,
            replay_prefix: format!("{key_prefix}:dpop:replay:"),
            max_retries: 3,
        })
    }

    /// Execute Redis operation with retry logic
    async fn with_retries<F, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> futures::future::BoxFuture<'static, RedisResult<T>>,
        T: Send + 'static,
    {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if attempts >= self.max_retries => {
                    error!(attempts, "Redis operation failed: {e}");
                    return Err(Error::Storage {
                        reason: format!("Redis operation failed: {e}"),
                    });
                }
                Err(e) => {
                    warn!(attempts, "Redis operation failed, retrying: {e}");
                    tokio::time::sleep(Duration::from_millis(100 * u64::from(attempts))).await;
                }
            }
        }
    }

    fn entry_key(&self, key: &str) -> String {
        format!("{}{}", self.replay_prefix, key)
    }
}

/// `EX` argument for `ttl`, rounded up to whole seconds and at least one
fn expire_secs(ttl: Duration) -> u64 {
    let secs = ttl
        .as_secs()
        .saturating_add(u64::from(ttl.subsec_nanos() > 0));
    secs.max(1)
}

#[async_trait]
impl ReplayStore for RedisReplayStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        let entry_key = self.entry_key(key);
        let client = self.client.clone();

        self.with_retries(|| {
            let client = client.clone();
            let entry_key = entry_key.clone();

            Box::pin(async move {
                let mut conn = client.get_multiplexed_async_connection().await?;
                conn.exists(&entry_key).await
            })
        })
        .await
    }

    async fn register(&self, key: &str, ttl: Duration) -> Result<()> {
        let entry_key = self.entry_key(key);
        let client = self.client.clone();
        let ttl_secs = expire_secs(ttl);

        self.with_retries(|| {
            let client = client.clone();
            let entry_key = entry_key.clone();

            Box::pin(async move {
                let mut conn = client.get_multiplexed_async_connection().await?;
                conn.set_ex::<_, _, ()>(&entry_key, 1u8, ttl_secs).await
            })
        })
        .await?;

        trace!(replay_key = key, "Registered replay key");
        Ok(())
    }

    async fn insert_if_absent(&self, key: &str, ttl: Duration) -> Result<bool> {
        let entry_key = self.entry_key(key);
        let client = self.client.clone();
        let ttl_secs = expire_secs(ttl);

        self.with_retries(|| {
            let client = client.clone();
            let entry_key = entry_key.clone();

            Box::pin(async move {
                let mut conn = client.get_multiplexed_async_connection().await?;
                // SET NX replies OK when written and nil when the key exists
                let reply: Option<String> = redis::cmd("SET")
                    .arg(&entry_key)
                    .arg(1u8)
                    .arg("NX")
                    .arg("EX")
                    .arg(ttl_secs)
                    .query_async(&mut conn)
                    .await?;
                Ok(reply.is_some())
            })
        })
        .await
        .inspect(|&inserted| {
            if inserted {
                trace!(replay_key = key, "Registered replay key");
            } else {
                warn!(replay_key = key, "Replay key already present");
            }
        })
    }
}
