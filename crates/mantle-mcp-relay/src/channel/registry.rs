//! In-memory channel registry for one worker process.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::trace;

type Callback = Arc<dyn Fn(&str) + Send + Sync>;

struct Listener {
    id: u64,
    callback: Callback,
}

#[derive(Default)]
struct Inner {
    channels: Mutex<HashMap<String, Vec<Listener>>>,
    next_id: AtomicU64,
}

/// Maps channel names to their live listeners.
///
/// Cheap to clone; clones share the same map. The lock guards map mutation
/// and the snapshot taken by `publish`, and is never held while a callback
/// runs, so a callback may itself subscribe, unsubscribe or publish.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    inner: Arc<Inner>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `on_message` for every later publish on `channel`.
    pub fn subscribe<F>(&self, channel: &str, on_message: F) -> Subscription
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .channels
            .lock()
            .entry(channel.to_string())
            .or_default()
            .push(Listener {
                id,
                callback: Arc::new(on_message),
            });
        trace!(channel, id, "Subscribed");
        Subscription {
            registry: self.clone(),
            channel: channel.to_string(),
            id,
            active: AtomicBool::new(true),
        }
    }

    /// Deliver `message` to the listeners registered right now, in
    /// registration order. Returns how many were called.
    pub fn publish(&self, channel: &str, message: &str) -> usize {
        let snapshot: Vec<Callback> = self
            .inner
            .channels
            .lock()
            .get(channel)
            .map(|listeners| listeners.iter().map(|l| Arc::clone(&l.callback)).collect())
            .unwrap_or_default();

        for callback in &snapshot {
            callback(message);
        }
        trace!(channel, delivered = snapshot.len(), "Published");
        snapshot.len()
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.inner.channels.lock().get(channel).map_or(0, Vec::len)
    }

    /// Number of channels with at least one listener.
    pub fn channel_count(&self) -> usize {
        self.inner.channels.lock().len()
    }

    fn remove(&self, channel: &str, id: u64) {
        let mut channels = self.inner.channels.lock();
        if let Some(listeners) = channels.get_mut(channel) {
            listeners.retain(|l| l.id != id);
            if listeners.is_empty() {
                channels.remove(channel);
            }
        }
    }
}

/// Handle to one registration. Dropping it unsubscribes.
pub struct Subscription {
    registry: ChannelRegistry,
    channel: String,
    id: u64,
    active: AtomicBool,
}

impl Subscription {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Remove the listener. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            self.registry.remove(&self.channel, self.id);
            trace!(channel = %self.channel, id = self.id, "Unsubscribed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |msg: &str| sink.lock().push(msg.to_string()))
    }

    #[test]
    fn publish_reaches_each_subscriber_once() {
        let registry = ChannelRegistry::new();
        let (a_seen, a) = collector();
        let (b_seen, b) = collector();
        let _a = registry.subscribe("c1", a);
        let _b = registry.subscribe("c1", b);

        assert_eq!(registry.publish("c1", "hello"), 2);
        assert_eq!(*a_seen.lock(), vec!["hello"]);
        assert_eq!(*b_seen.lock(), vec!["hello"]);
    }

    #[test]
    fn publish_without_subscribers_delivers_nothing() {
        let registry = ChannelRegistry::new();
        assert_eq!(registry.publish("nobody", "x"), 0);
        assert_eq!(registry.channel_count(), 0);
    }

    #[test]
    fn order_is_preserved_per_channel() {
        let registry = ChannelRegistry::new();
        let (seen, cb) = collector();
        let _sub = registry.subscribe("c1", cb);
        for i in 0..5 {
            registry.publish("c1", &i.to_string());
        }
        assert_eq!(*seen.lock(), vec!["0", "1", "2", "3", "4"]);
    }

    #[test]
    fn double_unsubscribe_is_noop() {
        let registry = ChannelRegistry::new();
        let (_seen, a) = collector();
        let (_seen_b, b) = collector();
        let sub = registry.subscribe("c1", a);
        let _other = registry.subscribe("c1", b);

        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());
        assert_eq!(registry.subscriber_count("c1"), 1);
    }

    #[test]
    fn last_unsubscribe_removes_channel() {
        let registry = ChannelRegistry::new();
        let (_seen, cb) = collector();
        let sub = registry.subscribe("c1", cb);
        assert_eq!(registry.channel_count(), 1);
        drop(sub);
        assert_eq!(registry.channel_count(), 0);
        assert_eq!(registry.subscriber_count("c1"), 0);
    }

    #[test]
    fn subscriber_added_during_delivery_misses_that_message() {
        let registry = ChannelRegistry::new();
        let late = Arc::new(Mutex::new(Vec::<Subscription>::new()));
        let late_seen = Arc::new(Mutex::new(Vec::<String>::new()));

        let reg = registry.clone();
        let late_ref = Arc::clone(&late);
        let late_seen_ref = Arc::clone(&late_seen);
        let _first = registry.subscribe("c1", move |_| {
            let seen = Arc::clone(&late_seen_ref);
            let sub = reg.subscribe("c1", move |m| seen.lock().push(m.to_string()));
            late_ref.lock().push(sub);
        });

        assert_eq!(registry.publish("c1", "one"), 1);
        assert!(late_seen.lock().is_empty());
        assert_eq!(registry.publish("c1", "two"), 2);
        assert_eq!(*late_seen.lock(), vec!["two"]);
    }

    #[test]
    fn callback_may_unsubscribe_itself() {
        let registry = ChannelRegistry::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let slot_ref = Arc::clone(&slot);
        let sub = registry.subscribe("c1", move |_| {
            if let Some(sub) = slot_ref.lock().take() {
                sub.unsubscribe();
            }
        });
        *slot.lock() = Some(sub);

        assert_eq!(registry.publish("c1", "x"), 1);
        assert_eq!(registry.subscriber_count("c1"), 0);
    }

    #[test]
    fn concurrent_subscribe_and_publish() {
        let registry = ChannelRegistry::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let channel = format!("c{}", i % 2);
                    for _ in 0..100 {
                        let sub = registry.subscribe(&channel, |_| {});
                        registry.publish(&channel, "m");
                        sub.unsubscribe();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(registry.channel_count(), 0);
    }
}
