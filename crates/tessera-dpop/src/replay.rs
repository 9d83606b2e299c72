//! Replay protection
//!
//! Proof identifiers are never stored raw. [`replay_key`] hashes a JTI with
//! BLAKE2b-256 so store keys have a bounded size and JTIs do not leak into
//! store logs. This is the only replay-key construction in the workspace.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use tessera_core::{Error, Result};

/// Default lifetime of a replay entry
pub const DEFAULT_REPLAY_TTL: Duration = Duration::from_secs(60);

type Blake2b256 = Blake2b<U32>;

/// base64url (no padding) of BLAKE2b-256 over the JTI
#[must_use]
pub fn replay_key(jti: &str) -> String {
    URL_SAFE_NO_PAD.encode(Blake2b256::digest(jti.as_bytes()))
}

/// How the verifier consumes a replay slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayMode {
    /// `exists` followed by `register`: two store calls, so concurrent
    /// duplicate submissions can both pass
    #[default]
    ExistsThenRegister,
    /// A single [`ReplayStore::insert_if_absent`] call, at-most-once when the
    /// store implements it atomically
    InsertIfAbsent,
}

/// Storage for consumed replay keys
///
/// The verifier passes the entry lifetime on every write, so one store can
/// serve verifiers with different freshness windows. Implementations must
/// keep a registered key for at least `ttl`.
#[async_trait]
pub trait ReplayStore: Send + Sync + std::fmt::Debug {
    /// Check if a key has been registered and not yet expired
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Register a key as consumed for `ttl`
    async fn register(&self, key: &str, ttl: Duration) -> Result<()>;

    /// Register `key` for `ttl` unless present; `Ok(true)` means this call
    /// consumed it
    ///
    /// The provided implementation is `exists` then `register` and is not
    /// atomic. Stores that can do better should override it.
    async fn insert_if_absent(&self, key: &str, ttl: Duration) -> Result<bool> {
        if self.exists(key).await? {
            return Ok(false);
        }
        self.register(key, ttl).await?;
        Ok(true)
    }
}

/// Expiry instant `ttl` from `now`, or a storage error if it is unrepresentable
fn expiry(now: Instant, ttl: Duration) -> Result<Instant> {
    now.checked_add(ttl)
        .ok_or_else(|| Error::storage(format!("Replay TTL {ttl:?} is out of range")))
}

/// In-memory replay store for single-instance deployments and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryReplayStore {
    /// Registered keys with their expiry instant
    entries: Arc<RwLock<HashMap<String, Instant>>>,
}

impl MemoryReplayStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired entries, returning how many were removed
    pub async fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let initial_count = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        let removed = initial_count - entries.len();
        if removed > 0 {
            tracing::debug!(removed, "Cleaned up expired replay entries");
        }
        removed
    }

    /// Number of live and not yet collected entries
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store holds no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ReplayStore for MemoryReplayStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self
            .entries
            .read()
            .await
            .get(key)
            .is_some_and(|expires_at| *expires_at > Instant::now()))
    }

    async fn register(&self, key: &str, ttl: Duration) -> Result<()> {
        let expires_at = expiry(Instant::now(), ttl)?;
        self.entries
            .write()
            .await
            .insert(key.to_string(), expires_at);
        Ok(())
    }

    async fn insert_if_absent(&self, key: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let expires_at = expiry(now, ttl)?;
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(current) if *current > now => Ok(false),
            _ => {
                entries.insert(key.to_string(), expires_at);
                Ok(true)
            }
        }
    }
}
