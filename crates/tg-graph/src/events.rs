//! `EventBus` — bounded, lossy, per-subscriber event fan-out.
//!
//! # Why this shape
//!
//! A slow WebSocket client must never block a route-planning request or
//! force the server to buffer unbounded history for it. Each subscriber
//! owns a small ring buffer (`VecDeque`) instead of sharing one queue, so
//! one slow reader can only ever lose its own events, never another
//! subscriber's. This is the same "bounded, sparse, subscriber-owned
//! queue" shape `WakeQueue` uses for per-tick agent wakeups, adapted from
//! a synchronous tick-loop drain to an async `recv()` a streaming task
//! can await.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::schema::{EdgeUpdatedMessage, SnapshotMessage};

/// Default per-subscriber queue capacity.
pub const DEFAULT_CAPACITY: usize = 128;

/// A message published on the event bus.
#[derive(Debug, Clone)]
pub enum Event {
    Snapshot(Arc<SnapshotMessage>),
    EdgeUpdated(Arc<EdgeUpdatedMessage>),
}

struct Inbox {
    queue: Mutex<VecDeque<Event>>,
    notify: Notify,
    capacity: usize,
}

impl Inbox {
    fn push(&self, event: Event) {
        let mut queue = self.queue.lock().unwrap();
        if queue.len() == self.capacity {
            queue.pop_front();
        }
        queue.push_back(event);
        drop(queue);
        self.notify.notify_waiters();
    }
}

/// A subscriber's handle to its own event queue. Cloning shares the same
/// underlying inbox (cheap, `Arc`-backed).
#[derive(Clone)]
pub struct Subscriber {
    id: u64,
    inbox: Arc<Inbox>,
}

impl Subscriber {
    /// The id this subscriber was registered under; pass to
    /// [`EventBus::unsubscribe`].
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Enqueue an event directly into this subscriber's own inbox,
    /// bypassing the bus-wide fan-out. Used to seed a new subscriber with
    /// its initial snapshot.
    pub(crate) fn push(&self, event: Event) {
        self.inbox.push(event);
    }

    /// Pop the oldest queued event, or `None` if the queue is currently
    /// empty.
    pub fn try_recv(&self) -> Option<Event> {
        self.inbox.queue.lock().unwrap().pop_front()
    }

    /// Wait for and return the next event, yielding to other tasks while
    /// the queue is empty.
    pub async fn recv(&self) -> Event {
        loop {
            if let Some(event) = self.try_recv() {
                return event;
            }
            self.inbox.notify.notified().await;
        }
    }
}

/// Publisher-facing event fan-out. The graph store holds one `EventBus`
/// and calls [`publish`](Self::publish) after every mutation; subscribers
/// call [`subscribe`](Self::subscribe) to start receiving events.
pub struct EventBus {
    subscribers: Mutex<Vec<(u64, Arc<Inbox>)>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        EventBus {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            capacity,
        }
    }

    /// Register a new subscriber with an empty queue.
    pub fn subscribe(&self) -> Subscriber {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let inbox = Arc::new(Inbox {
            queue: Mutex::new(VecDeque::with_capacity(self.capacity)),
            notify: Notify::new(),
            capacity: self.capacity,
        });
        self.subscribers.lock().unwrap().push((id, inbox.clone()));
        Subscriber { id, inbox }
    }

    /// Remove a subscriber. No-op if it was already removed.
    pub fn unsubscribe(&self, subscriber: &Subscriber) {
        self.subscribers
            .lock()
            .unwrap()
            .retain(|(id, _)| *id != subscriber.id);
    }

    /// Deliver `event` to every currently registered subscriber, dropping
    /// the oldest queued event for any subscriber whose queue is full.
    pub fn publish(&self, event: Event) {
        let subscribers = self.subscribers.lock().unwrap();
        for (_, inbox) in subscribers.iter() {
            inbox.push(event.clone());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EdgeView;
    use tg_core::Mode;

    fn sample_edge() -> EdgeUpdatedMessage {
        EdgeUpdatedMessage {
            edge: EdgeView {
                mode: Mode::Bus,
                source: "A".into(),
                target: "B".into(),
                key: "T1".into(),
                weight: 120.0,
                default_weight: Some(100.0),
                distance_km: None,
                speed_kmh: None,
                connector: Some(false),
                trip_id: None,
                route_id: None,
                route_short_name: None,
                route_long_name: None,
                context: None,
            },
        }
    }

    #[test]
    fn delivers_events_in_publish_order() {
        let bus = EventBus::new();
        let sub = bus.subscribe();
        for _ in 0..3 {
            bus.publish(Event::EdgeUpdated(Arc::new(sample_edge())));
        }
        assert!(matches!(sub.try_recv(), Some(Event::EdgeUpdated(_))));
        assert!(matches!(sub.try_recv(), Some(Event::EdgeUpdated(_))));
        assert!(matches!(sub.try_recv(), Some(Event::EdgeUpdated(_))));
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn drops_the_oldest_event_on_overflow() {
        let bus = EventBus::with_capacity(2);
        let sub = bus.subscribe();
        for i in 0..5u32 {
            let mut msg = sample_edge();
            msg.edge.key = i.to_string();
            bus.publish(Event::EdgeUpdated(Arc::new(msg)));
        }
        let first = sub.try_recv().unwrap();
        let Event::EdgeUpdated(msg) = first else {
            panic!("expected edge_updated");
        };
        assert_eq!(msg.edge.key, "3");
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let sub = bus.subscribe();
        bus.unsubscribe(&sub);
        bus.publish(Event::EdgeUpdated(Arc::new(sample_edge())));
        assert_eq!(bus.subscriber_count(), 0);
        assert!(sub.try_recv().is_none());
    }
}
