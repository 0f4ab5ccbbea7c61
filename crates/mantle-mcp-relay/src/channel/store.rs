//! Shared store abstraction used by the durable relay.

use std::time::Duration;

use async_trait::async_trait;

use crate::storage::DatabaseError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Expiring key/value store with per-channel queues, shared by every
/// worker of a deployment.
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Store `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Read an unexpired value.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Queue a stored key for the next consumer of `channel`.
    async fn push(&self, channel: &str, key: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Claim the next queued value on `channel`, waiting up to `wait`.
    /// `Ok(None)` means nothing arrived in time.
    async fn pop_wait(&self, channel: &str, wait: Duration) -> Result<Option<String>, StoreError>;

    /// Drop expired records. Returns how many were removed.
    async fn cleanup_expired(&self) -> Result<u64, StoreError>;
}
