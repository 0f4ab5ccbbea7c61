//! Storage layer tests for the relay store.

use std::time::Duration;

use super::db::RelayDatabase;
use super::store::SqliteStore;
use crate::channel::SharedStore;

async fn test_db() -> RelayDatabase {
    RelayDatabase::open_in_memory().await.unwrap()
}

// === Key/value tests ===

#[tokio::test]
async fn set_and_get_value() {
    let db = test_db().await;
    db.set_value("k1", "v1", 60).await.unwrap();

    let value = db.get_value("k1").await.unwrap().unwrap();
    assert_eq!(value.value, "v1");
    assert!(db.get_value("k2").await.unwrap().is_none());
}

#[tokio::test]
async fn set_value_overwrites() {
    let db = test_db().await;
    db.set_value("k1", "old", 60).await.unwrap();
    db.set_value("k1", "new", 60).await.unwrap();
    assert_eq!(db.get_value("k1").await.unwrap().unwrap().value, "new");
}

#[tokio::test]
async fn expired_value_is_invisible() {
    let db = test_db().await;
    db.set_value("k1", "v1", -1).await.unwrap();
    assert!(db.get_value("k1").await.unwrap().is_none());
}

// === Queue tests ===

#[tokio::test]
async fn claim_is_fifo_per_channel() {
    let db = test_db().await;
    db.enqueue("c1", "a", 60).await.unwrap();
    db.enqueue("c2", "x", 60).await.unwrap();
    db.enqueue("c1", "b", 60).await.unwrap();

    assert_eq!(db.claim_next("c1").await.unwrap().unwrap().message_key, "a");
    assert_eq!(db.claim_next("c1").await.unwrap().unwrap().message_key, "b");
    assert!(db.claim_next("c1").await.unwrap().is_none());
    assert_eq!(db.claim_next("c2").await.unwrap().unwrap().message_key, "x");
}

#[tokio::test]
async fn expired_entries_are_not_claimed() {
    let db = test_db().await;
    db.enqueue("c1", "stale", -1).await.unwrap();
    assert!(db.claim_next("c1").await.unwrap().is_none());
}

#[tokio::test]
async fn cleanup_removes_only_expired() {
    let db = test_db().await;
    db.set_value("old", "v", -1).await.unwrap();
    db.enqueue("c1", "old", -1).await.unwrap();
    db.set_value("fresh", "v", 60).await.unwrap();
    db.enqueue("c1", "fresh", 60).await.unwrap();

    assert_eq!(db.cleanup_expired().await.unwrap(), 2);
    assert!(db.get_value("fresh").await.unwrap().is_some());
    assert_eq!(db.claim_next("c1").await.unwrap().unwrap().message_key, "fresh");
    assert!(db.claim_next("c1").await.unwrap().is_none());
}

// === SharedStore tests ===

fn store(db: RelayDatabase) -> SqliteStore {
    SqliteStore::new(db, Duration::from_millis(10))
}

#[tokio::test]
async fn pop_wait_returns_pushed_value() {
    let store = store(test_db().await);
    store.set("message:c1:1", "hello", Duration::from_secs(60)).await.unwrap();
    store.push("c1", "message:c1:1", Duration::from_secs(60)).await.unwrap();

    let got = store.pop_wait("c1", Duration::from_millis(50)).await.unwrap();
    assert_eq!(got.as_deref(), Some("hello"));
    // The record stays readable by key; only the queue entry is consumed.
    assert_eq!(store.get("message:c1:1").await.unwrap().as_deref(), Some("hello"));
    assert!(store.pop_wait("c1", Duration::ZERO).await.unwrap().is_none());
}

#[tokio::test]
async fn pop_wait_times_out_empty() {
    let store = store(test_db().await);
    let started = tokio::time::Instant::now();
    let got = store.pop_wait("c1", Duration::from_millis(30)).await.unwrap();
    assert!(got.is_none());
    assert!(started.elapsed() >= Duration::from_millis(30));
}

#[tokio::test]
async fn pop_wait_sees_late_push() {
    let db = test_db().await;
    let store = store(db.clone());
    let writer = store.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        writer.set("k", "late", Duration::from_secs(60)).await.unwrap();
        writer.push("c1", "k", Duration::from_secs(60)).await.unwrap();
    });

    let got = store.pop_wait("c1", Duration::from_secs(2)).await.unwrap();
    assert_eq!(got.as_deref(), Some("late"));
}

#[tokio::test]
async fn pop_skips_entries_whose_value_expired() {
    let db = test_db().await;
    db.set_value("gone", "v", -1).await.unwrap();
    db.enqueue("c1", "gone", 60).await.unwrap();
    db.set_value("live", "v2", 60).await.unwrap();
    db.enqueue("c1", "live", 60).await.unwrap();

    let got = store(db).pop_wait("c1", Duration::ZERO).await.unwrap();
    assert_eq!(got.as_deref(), Some("v2"));
}

#[tokio::test]
async fn file_store_is_shared_between_pools() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.db");
    let a = store(RelayDatabase::open(&path).await.unwrap());
    let b = store(RelayDatabase::open(&path).await.unwrap());

    a.set("k", "cross", Duration::from_secs(60)).await.unwrap();
    a.push("c1", "k", Duration::from_secs(60)).await.unwrap();
    let got = b.pop_wait("c1", Duration::from_millis(100)).await.unwrap();
    assert_eq!(got.as_deref(), Some("cross"));
}
