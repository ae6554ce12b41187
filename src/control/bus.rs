//! Session-scoped event bus for subprocess output
//!
//! The host publishes `{ type, data, sessionId }` records; each streaming
//! session subscribes with a predicate and receives only matching records,
//! in publish order. Dropping a [`Subscription`] unsubscribes it, so every
//! exit path of a session (success, error, timeout, cancellation) releases
//! its listener.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::types::identifiers::SessionId;

/// Kind of a bus record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusEventKind {
    /// Raw stdout chunk
    Line,
    /// Raw stderr chunk
    Stderr,
    /// Transport-level failure
    Error,
    /// Output finished
    Done,
}

/// One record delivered by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusEvent {
    /// Record kind
    #[serde(rename = "type")]
    pub kind: BusEventKind,
    /// Payload text
    #[serde(default)]
    pub data: String,
    /// Session the record belongs to
    pub session_id: SessionId,
}

impl BusEvent {
    /// Stdout chunk for a session
    pub fn line(session_id: SessionId, data: impl Into<String>) -> Self {
        Self {
            kind: BusEventKind::Line,
            data: data.into(),
            session_id,
        }
    }

    /// Stderr chunk for a session
    pub fn stderr(session_id: SessionId, data: impl Into<String>) -> Self {
        Self {
            kind: BusEventKind::Stderr,
            data: data.into(),
            session_id,
        }
    }

    /// Transport failure for a session
    pub fn error(session_id: SessionId, message: impl Into<String>) -> Self {
        Self {
            kind: BusEventKind::Error,
            data: message.into(),
            session_id,
        }
    }

    /// End of output for a session
    #[must_use]
    pub fn done(session_id: SessionId) -> Self {
        Self {
            kind: BusEventKind::Done,
            data: String::new(),
            session_id,
        }
    }
}

type Predicate = Box<dyn Fn(&BusEvent) -> bool + Send + Sync>;

struct Subscriber {
    predicate: Predicate,
    tx: mpsc::UnboundedSender<BusEvent>,
}

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, Subscriber>>,
}

/// Cloneable handle to a shared event bus
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl EventBus {
    /// Create an empty bus
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a record to every subscriber whose predicate accepts it
    ///
    /// Returns the number of subscribers the record was delivered to.
    pub fn publish(&self, event: BusEvent) -> usize {
        let mut subscribers = self.inner.subscribers.lock();
        let mut delivered = 0;
        let mut closed = Vec::new();

        for (id, subscriber) in subscribers.iter() {
            if !(subscriber.predicate)(&event) {
                continue;
            }
            if subscriber.tx.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                closed.push(*id);
            }
        }

        for id in closed {
            subscribers.remove(&id);
        }

        if delivered == 0 {
            log::trace!(
                "Dropped {:?} record for session {} with no subscriber",
                event.kind,
                event.session_id
            );
        }
        delivered
    }

    /// Subscribe to every record the predicate accepts
    pub fn subscribe(
        &self,
        predicate: impl Fn(&BusEvent) -> bool + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        self.inner.subscribers.lock().insert(
            id,
            Subscriber {
                predicate: Box::new(predicate),
                tx,
            },
        );

        Subscription {
            id,
            rx,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Subscribe to the records of one session
    pub fn subscribe_session(&self, session_id: &SessionId) -> Subscription {
        let session_id = session_id.clone();
        self.subscribe(move |event| event.session_id == session_id)
    }

    /// Number of live subscriptions
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

/// Live subscription; unsubscribes when dropped
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<BusEvent>,
    bus: Weak<BusInner>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Subscription {
    /// Wait for the next matching record
    ///
    /// Returns `None` once the bus itself is gone and the queue is drained.
    pub async fn recv(&mut self) -> Option<BusEvent> {
        self.rx.recv().await
    }

    /// Take the next queued record without waiting
    pub fn try_recv(&mut self) -> Option<BusEvent> {
        self.rx.try_recv().ok()
    }

    /// Unsubscribe explicitly
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.subscribers.lock().remove(&self.id);
        }
    }
}
