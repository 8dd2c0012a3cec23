//! Live feed subscriber registry.
//!
//! Each subscriber owns a bounded queue. Broadcasting never waits: a
//! subscriber whose queue is closed or full is removed from the registry and
//! the broadcast carries on with the rest. The WebSocket task draining a
//! removed subscriber's queue sees it end and closes the connection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use prodline_telemetry::Metrics;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

/// Live feed topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Recent events and active machine positions.
    Production,
    /// Current rate estimates.
    Rates,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Rates => "rates",
        }
    }
}

/// Set of topics a subscriber listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topics {
    production: bool,
    rates: bool,
}

impl Topics {
    pub const ALL: Topics = Topics {
        production: true,
        rates: true,
    };

    pub fn only(topic: Topic) -> Self {
        Self {
            production: topic == Topic::Production,
            rates: topic == Topic::Rates,
        }
    }

    pub fn contains(&self, topic: Topic) -> bool {
        match topic {
            Topic::Production => self.production,
            Topic::Rates => self.rates,
        }
    }

    /// Topics in broadcast order.
    pub fn iter(&self) -> impl Iterator<Item = Topic> + '_ {
        [Topic::Production, Topic::Rates]
            .into_iter()
            .filter(|t| self.contains(*t))
    }
}

/// Opaque subscriber handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Registration rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscribeError {
    #[error("Subscriber limit reached ({0})")]
    Full(usize),

    #[error("Registry closed")]
    Closed,
}

struct Subscriber {
    topics: Topics,
    tx: mpsc::Sender<String>,
}

/// Registry of live feed subscribers, shared by the feed tasks and the
/// connection handlers.
pub struct SubscriberRegistry {
    subscribers: Mutex<HashMap<SubscriberId, Subscriber>>,
    next_id: AtomicU64,
    max_subscribers: usize,
    buffer: usize,
    closed: AtomicBool,
}

impl SubscriberRegistry {
    /// Create a registry accepting at most `max_subscribers`, each with a
    /// queue of `buffer` messages.
    pub fn new(max_subscribers: usize, buffer: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            max_subscribers,
            buffer: buffer.max(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Register an existing sender.
    pub fn register(
        &self,
        topics: Topics,
        tx: mpsc::Sender<String>,
    ) -> Result<SubscriberId, SubscribeError> {
        let mut subscribers = self.subscribers.lock();
        // Checked under the lock so close() cannot race a late registration.
        if self.closed.load(Ordering::Acquire) {
            return Err(SubscribeError::Closed);
        }
        if subscribers.len() >= self.max_subscribers {
            return Err(SubscribeError::Full(self.max_subscribers));
        }

        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        subscribers.insert(id, Subscriber { topics, tx });
        Metrics::subscribers(subscribers.len());
        debug!(subscriber = id.0, subscribers = subscribers.len(), "Subscriber added");
        Ok(id)
    }

    /// Create a queue for `topics` and register it.
    ///
    /// The returned [`Subscription`] unsubscribes itself when dropped.
    pub fn subscribe(self: &Arc<Self>, topics: Topics) -> Result<Subscription, SubscribeError> {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = self.register(topics, tx)?;
        Ok(Subscription {
            id,
            rx,
            registry: Arc::clone(self),
        })
    }

    /// Remove a subscriber. Removing an absent handle is a no-op.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let removed = subscribers.remove(&id).is_some();
        if removed {
            Metrics::subscribers(subscribers.len());
            debug!(subscriber = id.0, subscribers = subscribers.len(), "Subscriber removed");
        }
        removed
    }

    /// Send `message` to every subscriber of `topic`.
    ///
    /// Returns the number of successful deliveries. Subscribers whose send
    /// fails are removed.
    pub fn broadcast(&self, topic: Topic, message: &str) -> usize {
        let mut subscribers = self.subscribers.lock();
        let mut delivered = 0;
        let mut failed = Vec::new();

        for (id, subscriber) in subscribers.iter() {
            if !subscriber.topics.contains(topic) {
                continue;
            }
            match subscriber.tx.try_send(message.to_string()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    debug!(subscriber = id.0, topic = topic.as_str(), "Subscriber queue full, dropping");
                    failed.push(*id);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(subscriber = id.0, topic = topic.as_str(), "Subscriber gone, dropping");
                    failed.push(*id);
                }
            }
        }

        if !failed.is_empty() {
            for id in &failed {
                subscribers.remove(id);
            }
            Metrics::subscriber_send_failures(failed.len());
            Metrics::subscribers(subscribers.len());
        }

        delivered
    }

    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }

    /// Drop every subscriber and refuse new ones.
    pub fn close(&self) {
        let mut subscribers = self.subscribers.lock();
        self.closed.store(true, Ordering::Release);
        let dropped = subscribers.len();
        subscribers.clear();
        Metrics::subscribers(0);
        debug!(dropped, "Subscriber registry closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscribers", &self.len())
            .field("max_subscribers", &self.max_subscribers)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Receiving end of a registered subscriber.
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<String>,
    registry: Arc<SubscriberRegistry>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next message, or `None` once the registry has dropped this subscriber.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_survives_failed_subscriber() {
        let registry = SubscriberRegistry::new(10, 8);
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, rx_b) = mpsc::channel(8);
        let (tx_c, mut rx_c) = mpsc::channel(8);

        let a = registry.register(Topics::ALL, tx_a).unwrap();
        let b = registry.register(Topics::ALL, tx_b).unwrap();
        let c = registry.register(Topics::ALL, tx_c).unwrap();
        drop(rx_b);

        let delivered = registry.broadcast(Topic::Production, "hello");
        assert_eq!(delivered, 2);
        assert_eq!(registry.len(), 2);
        assert_eq!(rx_a.try_recv().unwrap(), "hello");
        assert_eq!(rx_c.try_recv().unwrap(), "hello");

        assert!(!registry.unsubscribe(b), "Failed subscriber already removed");
        assert!(registry.unsubscribe(a));
        assert!(registry.unsubscribe(c));
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let registry = SubscriberRegistry::new(10, 8);
        let (tx, _rx) = mpsc::channel(8);
        let id = registry.register(Topics::ALL, tx).unwrap();

        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_full_queue_drops_subscriber() {
        let registry = SubscriberRegistry::new(10, 1);
        let (tx, mut rx) = mpsc::channel(1);
        registry.register(Topics::ALL, tx).unwrap();

        assert_eq!(registry.broadcast(Topic::Rates, "first"), 1);
        assert_eq!(registry.broadcast(Topic::Rates, "second"), 0);
        assert!(registry.is_empty());
        assert_eq!(rx.try_recv().unwrap(), "first");
    }

    #[test]
    fn test_topic_filtering() {
        let registry = SubscriberRegistry::new(10, 8);
        let (tx_p, mut rx_p) = mpsc::channel(8);
        let (tx_r, mut rx_r) = mpsc::channel(8);
        registry.register(Topics::only(Topic::Production), tx_p).unwrap();
        registry.register(Topics::only(Topic::Rates), tx_r).unwrap();

        assert_eq!(registry.broadcast(Topic::Rates, "rates"), 1);
        assert!(rx_p.try_recv().is_err());
        assert_eq!(rx_r.try_recv().unwrap(), "rates");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_capacity_limit() {
        let registry = SubscriberRegistry::new(1, 8);
        let (tx1, _rx1) = mpsc::channel(8);
        let (tx2, _rx2) = mpsc::channel(8);
        registry.register(Topics::ALL, tx1).unwrap();
        assert_eq!(
            registry.register(Topics::ALL, tx2),
            Err(SubscribeError::Full(1))
        );
    }

    #[test]
    fn test_order_preserved_per_subscriber() {
        let registry = SubscriberRegistry::new(10, 8);
        let (tx, mut rx) = mpsc::channel(8);
        registry.register(Topics::ALL, tx).unwrap();

        for i in 0..5 {
            registry.broadcast(Topic::Production, &i.to_string());
        }
        for i in 0..5 {
            assert_eq!(rx.try_recv().unwrap(), i.to_string());
        }
    }

    #[tokio::test]
    async fn test_subscription_drop_unsubscribes() {
        let registry = Arc::new(SubscriberRegistry::new(10, 8));
        let mut subscription = registry.subscribe(Topics::ALL).unwrap();
        assert_eq!(registry.len(), 1);

        registry.broadcast(Topic::Production, "tick");
        assert_eq!(subscription.recv().await.as_deref(), Some("tick"));

        drop(subscription);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_close_ends_subscriptions() {
        let registry = Arc::new(SubscriberRegistry::new(10, 8));
        let mut subscription = registry.subscribe(Topics::ALL).unwrap();

        registry.close();
        assert!(subscription.recv().await.is_none());
        assert!(matches!(
            registry.subscribe(Topics::ALL),
            Err(SubscribeError::Closed)
        ));
    }
}
