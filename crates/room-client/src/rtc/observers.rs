//! Observer registry for transport events.
//!
//! The transport publishes through an [`EventSink`]; consumers hold a
//! [`Subscription`] per interest set. Emission takes one lock, so every
//! subscriber sees events in emission order and no two deliveries
//! interleave.
//!
//! Cancelling a subscription is idempotent and takes effect immediately:
//! events already buffered for it are discarded.

use super::events::{EventKind, RtcEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::trace;

struct Observer {
    id: u64,
    kinds: Vec<EventKind>,
    tx: mpsc::UnboundedSender<RtcEvent>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    observers: Vec<Observer>,
}

fn lock(inner: &Mutex<RegistryInner>) -> MutexGuard<'_, RegistryInner> {
    // A panicking emitter cannot leave the observer list half-updated.
    match inner.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Registry of event observers for one session.
#[derive(Clone, Default)]
pub struct ObserverRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl ObserverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in the given event kinds.
    #[must_use]
    pub fn subscribe(&self, kinds: &[EventKind]) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = lock(&self.inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.observers.push(Observer {
            id,
            kinds: kinds.to_vec(),
            tx,
        });

        Subscription {
            id,
            registry: Arc::clone(&self.inner),
            rx,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Handle the transport uses to publish events.
    #[must_use]
    pub fn sink(&self) -> EventSink {
        EventSink {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Number of live observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        lock(&self.inner).observers.len()
    }
}

/// Publishing side of an [`ObserverRegistry`].
#[derive(Clone)]
pub struct EventSink {
    inner: Arc<Mutex<RegistryInner>>,
}

impl EventSink {
    /// Deliver an event to every observer interested in its kind.
    pub fn emit(&self, event: RtcEvent) {
        let kind = event.kind();
        let mut inner = lock(&self.inner);

        inner.observers.retain(|observer| {
            if !observer.kinds.contains(&kind) {
                return true;
            }
            // A closed receiver means the subscription is gone.
            observer.tx.send(event.clone()).is_ok()
        });

        trace!(target: "room.rtc.observers", ?kind, observers = inner.observers.len(), "Event emitted");
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink").finish_non_exhaustive()
    }
}

/// Receiving side of one registration.
pub struct Subscription {
    id: u64,
    registry: Arc<Mutex<RegistryInner>>,
    rx: mpsc::UnboundedReceiver<RtcEvent>,
    cancelled: AtomicBool,
}

impl Subscription {
    /// Next event, or `None` once cancelled.
    pub async fn recv(&mut self) -> Option<RtcEvent> {
        if self.is_cancelled() {
            return None;
        }
        self.rx.recv().await
    }

    /// Unregister. Returns `true` only for the call that actually cancelled.
    pub fn cancel(&self) -> bool {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return false;
        }
        lock(&self.registry)
            .observers
            .retain(|observer| observer.id != self.id);
        true
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::types::StreamId;

    fn removed(id: &str) -> RtcEvent {
        RtcEvent::StreamRemoved {
            stream_id: StreamId::new(id),
            reason: "unpublish".to_string(),
        }
    }

    fn terminated() -> RtcEvent {
        RtcEvent::SessionTerminated {
            reason: "networkDisconnect".to_string(),
        }
    }

    #[tokio::test]
    async fn test_delivery_in_emission_order() {
        let registry = ObserverRegistry::new();
        let mut sub = registry.subscribe(&EventKind::ALL);
        let sink = registry.sink();

        sink.emit(removed("a"));
        sink.emit(removed("b"));
        sink.emit(terminated());

        assert_eq!(sub.recv().await, Some(removed("a")));
        assert_eq!(sub.recv().await, Some(removed("b")));
        assert_eq!(sub.recv().await, Some(terminated()));
    }

    #[tokio::test]
    async fn test_filters_by_kind() {
        let registry = ObserverRegistry::new();
        let mut sub = registry.subscribe(&[EventKind::SessionTerminated]);
        let sink = registry.sink();

        sink.emit(removed("a"));
        sink.emit(terminated());

        assert_eq!(sub.recv().await, Some(terminated()));
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let registry = ObserverRegistry::new();
        let sub = registry.subscribe(&EventKind::ALL);
        assert_eq!(registry.observer_count(), 1);

        assert!(sub.cancel());
        assert!(!sub.cancel());
        assert!(!sub.cancel());
        assert_eq!(registry.observer_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_discards_buffered_events() {
        let registry = ObserverRegistry::new();
        let mut sub = registry.subscribe(&EventKind::ALL);
        let sink = registry.sink();

        sink.emit(removed("a"));
        assert!(sub.cancel());
        sink.emit(removed("b"));

        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn test_drop_unregisters() {
        let registry = ObserverRegistry::new();
        {
            let _sub = registry.subscribe(&EventKind::ALL);
            assert_eq!(registry.observer_count(), 1);
        }
        assert_eq!(registry.observer_count(), 0);

        // Emitting with no observers is fine.
        registry.sink().emit(terminated());
    }

    #[tokio::test]
    async fn test_independent_subscribers() {
        let registry = ObserverRegistry::new();
        let mut first = registry.subscribe(&EventKind::ALL);
        let mut second = registry.subscribe(&EventKind::ALL);

        registry.sink().emit(removed("a"));
        first.cancel();
        registry.sink().emit(removed("b"));

        assert_eq!(first.recv().await, None);
        assert_eq!(second.recv().await, Some(removed("a")));
        assert_eq!(second.recv().await, Some(removed("b")));
    }
}
