//! Queries for the relay store.

use mantle_mcp_core::db::unix_timestamp;

use super::db::{DatabaseError, RelayDatabase};
use super::models::{QueuedMessage, StoredValue};

impl RelayDatabase {
    // =========================================================================
    // Key/value records
    // =========================================================================

    /// Insert or replace a value that expires after `ttl_secs`.
    pub async fn set_value(&self, key: &str, value: &str, ttl_secs: i64) -> Result<(), DatabaseError> {
        let now = unix_timestamp();
        sqlx::query(
            "INSERT INTO relay_values (key, value, expires_at, created_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
        )
        .bind(key)
        .bind(value)
        .bind(now + ttl_secs)
        .bind(now)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Fetch an unexpired value.
    pub async fn get_value(&self, key: &str) -> Result<Option<StoredValue>, DatabaseError> {
        let value = sqlx::query_as::<_, StoredValue>(
            "SELECT * FROM relay_values WHERE key = ? AND expires_at > ?",
        )
        .bind(key)
        .bind(unix_timestamp())
        .fetch_optional(self.pool())
        .await?;
        Ok(value)
    }

    // =========================================================================
    // Channel queues
    // =========================================================================

    /// Append a message key to a channel's queue.
    pub async fn enqueue(
        &self,
        channel: &str,
        message_key: &str,
        ttl_secs: i64,
    ) -> Result<i64, DatabaseError> {
        let now = unix_timestamp();
        let result = sqlx::query(
            "INSERT INTO relay_queue (channel, message_key, expires_at, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(channel)
        .bind(message_key)
        .bind(now + ttl_secs)
        .bind(now)
        .execute(self.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Atomically remove and return the oldest unexpired entry of a channel.
    ///
    /// The single `DELETE .. RETURNING` statement means two workers polling
    /// the same channel never claim the same entry.
    pub async fn claim_next(&self, channel: &str) -> Result<Option<QueuedMessage>, DatabaseError> {
        let claimed = sqlx::query_as::<_, QueuedMessage>(
            "DELETE FROM relay_queue WHERE id = (
                SELECT id FROM relay_queue WHERE channel = ? AND expires_at > ? ORDER BY id LIMIT 1
             ) RETURNING *",
        )
        .bind(channel)
        .bind(unix_timestamp())
        .fetch_optional(self.pool())
        .await?;
        Ok(claimed)
    }

    /// Delete expired values and queue entries. Returns rows removed.
    pub async fn cleanup_expired(&self) -> Result<u64, DatabaseError> {
        let now = unix_timestamp();
        let queued = sqlx::query("DELETE FROM relay_queue WHERE expires_at <= ?")
            .bind(now)
            .execute(self.pool())
            .await?;
        let values = sqlx::query("DELETE FROM relay_values WHERE expires_at <= ?")
            .bind(now)
            .execute(self.pool())
            .await?;
        Ok(queued.rows_affected() + values.rows_affected())
    }
}
