//! [`SharedStore`] backed by the relay SQLite database.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

use super::db::RelayDatabase;
use crate::channel::{SharedStore, StoreError};

/// Polling SQLite store. `pop_wait` re-checks the queue every
/// `poll_interval` until its deadline, so wake latency is bounded by that
/// interval rather than being immediate.
#[derive(Clone)]
pub struct SqliteStore {
    db: RelayDatabase,
    poll_interval: Duration,
}

impl SqliteStore {
    pub fn new(db: RelayDatabase, poll_interval: Duration) -> Self {
        Self {
            db,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    /// One non-blocking claim attempt. Entries whose value already expired
    /// are skipped.
    async fn try_pop(&self, channel: &str) -> Result<Option<String>, StoreError> {
        while let Some(entry) = self.db.claim_next(channel).await? {
            if let Some(value) = self.db.get_value(&entry.message_key).await? {
                return Ok(Some(value.value));
            }
            debug!(channel, key = %entry.message_key, "Queued message expired before claim");
        }
        Ok(None)
    }
}

fn ttl_secs(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX / 2).max(1)
}

#[async_trait]
impl SharedStore for SqliteStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        Ok(self.db.set_value(key, value, ttl_secs(ttl)).await?)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.db.get_value(key).await?.map(|v| v.value))
    }

    async fn push(&self, channel: &str, key: &str, ttl: Duration) -> Result<(), StoreError> {
        self.db.enqueue(channel, key, ttl_secs(ttl)).await?;
        Ok(())
    }

    async fn pop_wait(&self, channel: &str, wait: Duration) -> Result<Option<String>, StoreError> {
        let deadline = Instant::now() + wait;
        loop {
            if let Some(value) = self.try_pop(channel).await? {
                return Ok(Some(value));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    async fn cleanup_expired(&self) -> Result<u64, StoreError> {
        Ok(self.db.cleanup_expired().await?)
    }
}
