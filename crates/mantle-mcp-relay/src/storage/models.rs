//! Database row models for the relay store.

use sqlx::FromRow;

/// Expiring key/value record.
#[derive(Debug, Clone, FromRow)]
pub struct StoredValue {
    pub key: String,
    pub value: String,
    pub expires_at: i64,
    pub created_at: i64,
}

/// Queue entry pointing at a [`StoredValue`] awaiting a consumer.
#[derive(Debug, Clone, FromRow)]
pub struct QueuedMessage {
    pub id: i64,
    pub channel: String,
    pub message_key: String,
    pub expires_at: i64,
    pub created_at: i64,
}
