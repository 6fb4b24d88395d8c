use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;

use crate::wire::WireEvent;

// Bounded per-subscriber channels: a slow consumer drops events rather
// than stalling the table or exhausting memory.
const EVENT_CHANNEL_BUFFER: usize = 256;

pub type TableId = String;

/// Fan-out hub keyed by table id. Each subscriber is one client's event
/// stream, optionally tied to a player id so `table_state` broadcasts
/// can be personalized.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    inner: Arc<EventBusInner>,
}

#[derive(Debug, Default)]
struct EventBusInner {
    rooms: RwLock<HashMap<TableId, Vec<Subscriber>>>,
    next_id: AtomicUsize,
}

#[derive(Debug, Clone)]
struct Subscriber {
    id: usize,
    observer: Option<String>,
    tx: mpsc::Sender<WireEvent>,
}

/// A live subscription; dropping it unsubscribes.
pub struct RoomSubscription {
    bus: EventBus,
    table_id: TableId,
    subscriber_id: usize,
    receiver: Option<mpsc::Receiver<WireEvent>>,
}

impl RoomSubscription {
    /// Take the receiving half to drive a stream; may be taken once.
    pub fn take_receiver(&mut self) -> Option<mpsc::Receiver<WireEvent>> {
        self.receiver.take()
    }

    pub fn receiver_mut(&mut self) -> Option<&mut mpsc::Receiver<WireEvent>> {
        self.receiver.as_mut()
    }
}

impl Drop for RoomSubscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(&self.table_id, self.subscriber_id);
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, table_id: TableId, observer: Option<String>) -> RoomSubscription {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_BUFFER);
        let id = self.inner.next_id.fetch_add(1, Ordering::AcqRel);
        {
            let mut rooms = self.inner.rooms.write().expect("event bus lock poisoned");
            rooms.entry(table_id.clone()).or_default().push(Subscriber {
                id,
                observer: observer.clone(),
                tx,
            });
        }
        tracing::debug!(
            table_id = %table_id,
            subscriber_id = id,
            observer = ?observer,
            "client subscribed to table events"
        );
        RoomSubscription {
            bus: self.clone(),
            table_id,
            subscriber_id: id,
            receiver: Some(rx),
        }
    }

    /// Send the same event to every subscriber of the room.
    pub fn broadcast(&self, table_id: &str, event: WireEvent) {
        self.broadcast_personalized(table_id, |_| event.clone());
    }

    /// Send a per-recipient event built from the subscriber's observer
    /// id; used for sanitized `table_state` projections.
    pub fn broadcast_personalized(
        &self,
        table_id: &str,
        make: impl Fn(Option<&str>) -> WireEvent,
    ) {
        let subscribers = {
            let rooms = self.inner.rooms.read().expect("event bus lock poisoned");
            match rooms.get(table_id) {
                Some(list) => list.clone(),
                None => return,
            }
        };

        let mut stale = Vec::new();
        for subscriber in subscribers {
            let event = make(subscriber.observer.as_deref());
            if let Err(err) = subscriber.tx.try_send(event) {
                tracing::warn!(
                    table_id = %table_id,
                    subscriber_id = subscriber.id,
                    error = ?err,
                    "dropping event for slow or gone subscriber"
                );
                if matches!(err, mpsc::error::TrySendError::Closed(_)) {
                    stale.push(subscriber.id);
                }
            }
        }
        if !stale.is_empty() {
            self.remove_subscribers(table_id, &stale);
        }
    }

    pub fn unsubscribe(&self, table_id: &str, subscriber_id: usize) {
        self.remove_subscribers(table_id, &[subscriber_id]);
    }

    /// Drop every subscription for a removed table.
    pub fn drop_room(&self, table_id: &str) {
        let mut rooms = self.inner.rooms.write().expect("event bus lock poisoned");
        rooms.remove(table_id);
    }

    pub fn subscriber_count(&self) -> usize {
        let rooms = self.inner.rooms.read().expect("event bus lock poisoned");
        rooms.values().map(|list| list.len()).sum()
    }

    fn remove_subscribers(&self, table_id: &str, ids: &[usize]) {
        let mut rooms = self.inner.rooms.write().expect("event bus lock poisoned");
        if let Some(list) = rooms.get_mut(table_id) {
            list.retain(|s| !ids.contains(&s.id));
            if list.is_empty() {
                rooms.remove(table_id);
            }
        }
    }
}
