//! Durable relay: a channel that also reaches subscribers in other workers.
//!
//! `publish` first notifies in-process listeners. When a shared store is
//! configured the message is also recorded under a `message:` key, and if no
//! local listener took it, the key is queued on the channel so a poller in
//! another worker can claim it. Exactly one path hands the message to a
//! consumer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::names::message_key;
use super::registry::{ChannelRegistry, Subscription};
use super::store::{SharedStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("No local subscriber and the shared store failed: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaySettings {
    /// Lifetime of stored messages.
    pub ttl: Duration,
    /// Upper bound of one `pop_wait` issued by a subscription's poller.
    pub pop_wait: Duration,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            pop_wait: Duration::from_secs(1),
        }
    }
}

/// Outcome of one publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// In-process listeners that received the message.
    pub local: usize,
    /// Whether the message was queued for another worker.
    pub queued: bool,
}

#[derive(Clone)]
pub struct DurableRelay {
    registry: ChannelRegistry,
    store: Option<Arc<dyn SharedStore>>,
    settings: RelaySettings,
}

impl DurableRelay {
    /// Relay confined to this process.
    pub fn local(registry: ChannelRegistry) -> Self {
        Self {
            registry,
            store: None,
            settings: RelaySettings::default(),
        }
    }

    /// Relay that hands messages to other workers through `store`.
    pub fn with_store(
        registry: ChannelRegistry,
        store: Arc<dyn SharedStore>,
        settings: RelaySettings,
    ) -> Self {
        Self {
            registry,
            store: Some(store),
            settings,
        }
    }

    pub const fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// Publish `message` on `channel`.
    ///
    /// Store failures are logged and ignored once a local listener has the
    /// message. They are returned only when nothing else could carry it.
    pub async fn publish(&self, channel: &str, message: &str) -> Result<Delivery, RelayError> {
        let local = self.registry.publish(channel, message);
        let Some(store) = &self.store else {
            if local == 0 {
                debug!(channel, "No subscriber for message, dropped");
            }
            return Ok(Delivery {
                local,
                queued: false,
            });
        };

        let key = message_key(channel);
        let stored = async {
            store.set(&key, message, self.settings.ttl).await?;
            if local == 0 {
                store.push(channel, &key, self.settings.ttl).await?;
            }
            Ok::<_, StoreError>(())
        }
        .await;

        match stored {
            Ok(()) => Ok(Delivery {
                local,
                queued: local == 0,
            }),
            Err(e) if local > 0 => {
                warn!(channel, error = %e, "Shared store write failed, delivered in-process only");
                Ok(Delivery {
                    local,
                    queued: false,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Listen on `channel` in this process and, with a store, in the shared
    /// queue.
    pub fn subscribe(&self, channel: &str) -> RelaySubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let local_tx = tx.clone();
        let local = self.registry.subscribe(channel, move |msg| {
            // Receiver gone means the subscription is being torn down.
            let _ = local_tx.send(msg.to_string());
        });
        let poller = self.store.as_ref().map(|store| {
            tokio::spawn(poll_store(
                Arc::clone(store),
                channel.to_string(),
                self.settings.pop_wait,
                tx,
            ))
        });
        RelaySubscription {
            rx,
            local,
            poller,
        }
    }

    /// Remove expired store records.
    pub async fn cleanup_expired(&self) -> Result<u64, StoreError> {
        match &self.store {
            Some(store) => store.cleanup_expired().await,
            None => Ok(0),
        }
    }
}

/// Claim messages queued for `channel` until the subscription goes away.
async fn poll_store(
    store: Arc<dyn SharedStore>,
    channel: String,
    wait: Duration,
    tx: mpsc::UnboundedSender<String>,
) {
    let mut failing = false;
    while !tx.is_closed() {
        match store.pop_wait(&channel, wait).await {
            Ok(Some(message)) => {
                failing = false;
                if tx.send(message).is_err() {
                    debug!(channel = %channel, "Claimed message after subscriber left, discarded");
                    break;
                }
            }
            Ok(None) => failing = false,
            Err(e) => {
                if !failing {
                    warn!(channel = %channel, error = %e, "Shared store poll failed");
                    failing = true;
                }
                tokio::time::sleep(wait).await;
            }
        }
    }
}

/// Merged in-process and cross-worker stream of one channel.
///
/// Dropping it removes the local listener and stops the store poller.
pub struct RelaySubscription {
    rx: mpsc::UnboundedReceiver<String>,
    local: Subscription,
    poller: Option<JoinHandle<()>>,
}

impl RelaySubscription {
    pub fn channel(&self) -> &str {
        self.local.channel()
    }

    /// Next message. `None` once unsubscribed and drained.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Stop receiving. Idempotent.
    pub fn unsubscribe(&mut self) {
        self.local.unsubscribe();
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
        self.rx.close();
    }
}

impl Drop for RelaySubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::storage::{RelayDatabase, SqliteStore};

    async fn sqlite_store() -> Arc<dyn SharedStore> {
        let db = RelayDatabase::open_in_memory().await.unwrap();
        Arc::new(SqliteStore::new(db, Duration::from_millis(5)))
    }

    fn settings() -> RelaySettings {
        RelaySettings {
            ttl: Duration::from_secs(60),
            pop_wait: Duration::from_millis(20),
        }
    }

    /// Store whose every operation fails.
    struct DownStore;

    #[async_trait]
    impl SharedStore for DownStore {
        async fn set(&self, _: &str, _: &str, _: Duration) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn get(&self, _: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn push(&self, _: &str, _: &str, _: Duration) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn pop_wait(&self, _: &str, _: Duration) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn cleanup_expired(&self) -> Result<u64, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
    }

    #[tokio::test]
    async fn local_relay_delivers_in_process() {
        let relay = DurableRelay::local(ChannelRegistry::new());
        let mut sub = relay.subscribe("c1");
        let delivery = relay.publish("c1", "hi").await.unwrap();
        assert_eq!(delivery, Delivery { local: 1, queued: false });
        assert_eq!(sub.recv().await.as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn local_subscriber_wins_over_store() {
        let store = sqlite_store().await;
        let relay = DurableRelay::with_store(ChannelRegistry::new(), Arc::clone(&store), settings());
        let mut sub = relay.subscribe("c1");

        let delivery = relay.publish("c1", "once").await.unwrap();
        assert_eq!(delivery, Delivery { local: 1, queued: false });
        assert_eq!(sub.recv().await.as_deref(), Some("once"));
        // Nothing queued, so the poller cannot deliver a second copy.
        assert!(store.pop_wait("c1", Duration::ZERO).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn message_reaches_subscriber_on_other_worker() {
        let store = sqlite_store().await;
        let worker_a = DurableRelay::with_store(ChannelRegistry::new(), Arc::clone(&store), settings());
        let worker_b = DurableRelay::with_store(ChannelRegistry::new(), store, settings());

        let mut sub = worker_b.subscribe("c1");
        let delivery = worker_a.publish("c1", "cross").await.unwrap();
        assert_eq!(delivery, Delivery { local: 0, queued: true });

        let got = tokio::time::timeout(Duration::from_secs(2), sub.recv()).await.unwrap();
        assert_eq!(got.as_deref(), Some("cross"));
    }

    #[tokio::test]
    async fn store_outage_keeps_local_delivery() {
        let relay = DurableRelay::with_store(ChannelRegistry::new(), Arc::new(DownStore), settings());
        let mut sub = relay.subscribe("c1");
        let delivery = relay.publish("c1", "still here").await.unwrap();
        assert_eq!(delivery, Delivery { local: 1, queued: false });
        assert_eq!(sub.recv().await.as_deref(), Some("still here"));
    }

    #[tokio::test]
    async fn store_outage_without_listener_is_an_error() {
        let relay = DurableRelay::with_store(ChannelRegistry::new(), Arc::new(DownStore), settings());
        assert!(matches!(
            relay.publish("c1", "lost").await,
            Err(RelayError::Store(_))
        ));
    }

    #[tokio::test]
    async fn dropping_subscription_clears_registry() {
        let relay = DurableRelay::with_store(ChannelRegistry::new(), sqlite_store().await, settings());
        let sub = relay.subscribe("c1");
        assert_eq!(relay.registry().subscriber_count("c1"), 1);
        drop(sub);
        assert_eq!(relay.registry().subscriber_count("c1"), 0);
    }

    #[tokio::test]
    async fn unsubscribe_twice_is_noop() {
        let relay = DurableRelay::local(ChannelRegistry::new());
        let mut sub = relay.subscribe("c1");
        sub.unsubscribe();
        sub.unsubscribe();
        assert!(sub.recv().await.is_none());
        assert_eq!(relay.registry().channel_count(), 0);
    }
}
