//! Publish/subscribe hub for world events.
//!
//! Every subscriber owns a bounded queue. Publishing never waits: when a
//! queue is full the event is dropped for that subscriber only, and queues
//! whose receiver is gone are pruned. A slow observer therefore cannot
//! stall the tick or any other observer.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use rendezvous_types::WorldEvent;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

/// Queue depth used by [`EventHub::default`].
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

#[derive(Debug)]
struct HubInner {
    subscribers: Mutex<BTreeMap<u64, mpsc::Sender<Arc<WorldEvent>>>>,
    next_id: AtomicU64,
    capacity: usize,
}

/// Fan-out of [`WorldEvent`]s to any number of subscribers.
///
/// Cheap to clone; clones share the same subscriber set.
#[derive(Debug, Clone)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl EventHub {
    /// A hub whose subscribers buffer up to `capacity` events each.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                subscribers: Mutex::new(BTreeMap::new()),
                next_id: AtomicU64::new(0),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Register a new subscriber. Dropping the [`Subscription`]
    /// unsubscribes it.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.inner.capacity);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);
        debug!(subscriber = id, "Subscriber registered");
        Subscription {
            id,
            rx,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `event` to every subscriber with room in its queue.
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(&self, event: WorldEvent) -> usize {
        let event = Arc::new(event);
        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut delivered: usize = 0;
        let mut closed = Vec::new();
        for (id, tx) in subscribers.iter() {
            match tx.try_send(Arc::clone(&event)) {
                Ok(()) => delivered = delivered.saturating_add(1),
                Err(TrySendError::Full(_)) => {
                    debug!(subscriber = id, "Subscriber queue full, event dropped");
                }
                Err(TrySendError::Closed(_)) => closed.push(*id),
            }
        }
        for id in closed {
            subscribers.remove(&id);
            debug!(subscriber = id, "Subscriber dropped");
        }
        delivered
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

/// The receiving end of one subscriber's queue.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<Arc<WorldEvent>>,
    hub: Weak<HubInner>,
}

impl Subscription {
    /// The next event, or `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<Arc<WorldEvent>> {
        self.rx.recv().await
    }

    /// The next event, or a [`WorldEvent::Ping`] if none arrives within
    /// `keepalive`.
    pub async fn recv_or_ping(&mut self, keepalive: Duration) -> Option<Arc<WorldEvent>> {
        match tokio::time::timeout(keepalive, self.rx.recv()).await {
            Ok(event) => event,
            Err(_) => Some(Arc::new(WorldEvent::Ping)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&self.id);
            debug!(subscriber = self.id, "Subscriber removed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn error(message: &str) -> WorldEvent {
        WorldEvent::Error {
            message: message.to_owned(),
            conversation_id: None,
        }
    }

    #[tokio::test]
    async fn every_subscriber_receives_events() {
        let hub = EventHub::new(8);
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        assert_eq!(hub.publish(error("one")), 2);

        assert_eq!(*a.recv().await.unwrap(), error("one"));
        assert_eq!(*b.recv().await.unwrap(), error("one"));
    }

    #[tokio::test]
    async fn slow_subscriber_does_not_block_others() {
        let hub = EventHub::new(2);
        let _slow = hub.subscribe();
        let mut fast = hub.subscribe();

        for i in 0..5 {
            hub.publish(error(&i.to_string()));
            assert_eq!(*fast.recv().await.unwrap(), error(&i.to_string()));
        }
        assert_eq!(hub.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn full_queue_keeps_oldest_events() {
        let hub = EventHub::new(2);
        let mut slow = hub.subscribe();
        for i in 0..4 {
            hub.publish(error(&i.to_string()));
        }
        assert_eq!(*slow.recv().await.unwrap(), error("0"));
        assert_eq!(*slow.recv().await.unwrap(), error("1"));
        hub.publish(error("4"));
        assert_eq!(*slow.recv().await.unwrap(), error("4"));
    }

    #[tokio::test]
    async fn dropping_subscription_unsubscribes() {
        let hub = EventHub::default();
        let sub = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);
        drop(sub);
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.publish(WorldEvent::Ping), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn silence_yields_ping() {
        let hub = EventHub::default();
        let mut sub = hub.subscribe();
        let event = sub.recv_or_ping(Duration::from_secs(1)).await.unwrap();
        assert_eq!(*event, WorldEvent::Ping);
    }

    #[tokio::test(start_paused = true)]
    async fn real_event_beats_ping() {
        let hub = EventHub::default();
        let mut sub = hub.subscribe();
        hub.publish(error("live"));
        let event = sub.recv_or_ping(Duration::from_secs(1)).await.unwrap();
        assert_eq!(*event, error("live"));
    }
}
