use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, warn};
use uuid::Uuid;

use bulletin_types::events::PushEvent;

/// Default depth of each subscriber's queue.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

/// An event as delivered to subscribers, serialized once per publish.
#[derive(Debug)]
pub struct BroadcastMessage {
    pub event: PushEvent,
    pub json: String,
}

/// Owns the live subscriber set and fans committed content out to it.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

struct HubInner {
    /// subscriber id -> queue sender. Held for the whole of a publish so each
    /// fanout is one unit relative to other publishes and to (un)subscribes.
    subscribers: Mutex<HashMap<Uuid, mpsc::Sender<Arc<BroadcastMessage>>>>,
    buffer: usize,
}

impl HubInner {
    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, mpsc::Sender<Arc<BroadcastMessage>>>> {
        // The map holds no invariant a panicking holder could break
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: Uuid) -> bool {
        self.lock().remove(&id).is_some()
    }
}

/// Handle for one live connection. Dropping it unsubscribes.
pub struct Subscription {
    id: Uuid,
    rx: mpsc::Receiver<Arc<BroadcastMessage>>,
    hub: Weak<HubInner>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Next event, or `None` once the hub has dropped this subscriber.
    pub async fn recv(&mut self) -> Option<Arc<BroadcastMessage>> {
        self.rx.recv().await
    }

    /// Next already-queued event, without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<BroadcastMessage>> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.hub.upgrade() {
            inner.remove(self.id);
        }
    }
}

impl Hub {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_SUBSCRIBER_BUFFER)
    }

    /// `buffer` is the number of undelivered events a subscriber may hold
    /// before further events are dropped for it.
    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                subscribers: Mutex::new(HashMap::new()),
                buffer: buffer.max(1),
            }),
        }
    }

    /// Register a new subscriber. It sees only events published after this call.
    pub fn subscribe(&self) -> Subscription {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.inner.buffer);
        self.inner.lock().insert(id, tx);
        debug!(subscriber = %id, "subscriber registered");

        Subscription {
            id,
            rx,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Remove a subscriber. Unknown or already-removed ids are ignored.
    pub fn unsubscribe(&self, id: Uuid) {
        if self.inner.remove(id) {
            debug!(subscriber = %id, "subscriber removed");
        }
    }

    /// Deliver `event` to every currently registered subscriber and return how
    /// many accepted it. Never fails: a subscriber that is gone or whose queue
    /// is full just misses the event.
    pub fn publish(&self, event: PushEvent) -> usize {
        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize {} event: {}", event.kind(), e);
                return 0;
            }
        };
        let kind = event.kind();
        let message = Arc::new(BroadcastMessage { event, json });

        let mut subscribers = self.inner.lock();
        let total = subscribers.len();
        let mut delivered = 0;

        subscribers.retain(|id, tx| match tx.try_send(message.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(subscriber = %id, "Subscriber queue full, dropping {} event", kind);
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!(subscriber = %id, "Pruning closed subscriber");
                false
            }
        });

        debug!("Published {} to {}/{} subscribers", kind, delivered, total);
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().len()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}
