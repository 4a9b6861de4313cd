//! Message bus between the editor core and its collaborators.
//!
//! The thumbnail worker, the drag engine and the editor controller never call
//! each other directly for notifications. Instead:
//! - `emit()` invokes subscribed callbacks immediately AND queues the event
//! - `poll()` drains queued events for the controller's main loop
//!
//! Outbound "thumbnail" requests and inbound "thumbnail_finished" notices are
//! plain event types (see `bus_events`), so a host can bridge them to any IPC.
//!
//! Callback order: FIFO within one event type. No ordering across types.
//! Callbacks must not call back into a component that is currently emitting
//! under its own lock; components emit only after releasing their state.

use log::warn;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Queue length at which the oldest half of undrained events is dropped
const MAX_QUEUE_SIZE: usize = 1000;

/// Marker trait for bus events. Blanket-implemented for every `Send + Sync` type.
pub trait Event: Any + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync + 'static> Event for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

type Callback = Arc<dyn Fn(&dyn Any) + Send + Sync>;

/// Boxed event as stored in the deferred queue
pub type BoxedEvent = Box<dyn Event>;

/// State shared by the bus and every emitter cloned from it.
#[derive(Default)]
struct Shared {
    subscribers: RwLock<HashMap<TypeId, Vec<Callback>>>,
    queue: Mutex<Vec<BoxedEvent>>,
}

impl Shared {
    fn publish<E: Event>(&self, event: E) {
        let callbacks: Vec<Callback> = self
            .subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&TypeId::of::<E>())
            .cloned()
            .unwrap_or_default();
        // Subscribers lock released before calling out, so a callback may subscribe
        for cb in &callbacks {
            cb(&event);
        }

        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        if queue.len() >= MAX_QUEUE_SIZE {
            let evict = queue.len() / 2;
            warn!("Bus queue full ({} events), dropping oldest {}", queue.len(), evict);
            queue.drain(0..evict);
        }
        queue.push(Box::new(event));
    }
}

/// Pub/sub bus with deferred polling.
///
/// Cloning is cheap; every clone talks to the same subscribers and queue.
#[derive(Clone, Default)]
pub struct EventBus {
    shared: Arc<Shared>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events of type `E`. The callback runs synchronously inside `emit()`.
    pub fn subscribe<E, F>(&self, callback: F)
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let wrapped: Callback = Arc::new(move |any: &dyn Any| {
            if let Some(event) = any.downcast_ref::<E>() {
                callback(event);
            }
        });
        self.shared
            .subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(TypeId::of::<E>())
            .or_default()
            .push(wrapped);
    }

    /// Invoke subscribers for `E`, then queue the event for `poll()`.
    pub fn emit<E: Event>(&self, event: E) {
        self.shared.publish(event);
    }

    /// Drain every event emitted since the last poll, oldest first.
    pub fn poll(&self) -> Vec<BoxedEvent> {
        std::mem::take(&mut *self.shared.queue.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Handle for components that only publish.
    pub fn emitter(&self) -> EventEmitter {
        EventEmitter {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn unsubscribe_all<E: Event>(&self) {
        self.shared
            .subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&TypeId::of::<E>());
    }

    pub fn queue_len(&self) -> usize {
        self.shared.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Publish-only handle given to the queue and the drag engine.
#[derive(Clone)]
pub struct EventEmitter {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("queue_len", &self.shared.queue.lock().map(|q| q.len()).unwrap_or(0))
            .finish()
    }
}

impl EventEmitter {
    pub fn emit<E: Event>(&self, event: E) {
        self.shared.publish(event);
    }
}

/// Emitter that may be detached (components built before the bus exists, tests).
#[derive(Clone, Default, Debug)]
pub struct BusEmitter {
    inner: Option<EventEmitter>,
}

impl BusEmitter {
    /// No-op emitter
    pub fn dummy() -> Self {
        Self { inner: None }
    }

    pub fn from_emitter(emitter: EventEmitter) -> Self {
        Self { inner: Some(emitter) }
    }

    pub fn emit<E: Event>(&self, event: E) {
        if let Some(emitter) = &self.inner {
            emitter.emit(event);
        }
    }
}

/// Downcast a polled event.
///
/// Derefs to `dyn Event` first: calling `as_any()` on the `Box` itself would hit
/// the blanket impl for `Box<dyn Event>` and the downcast would always fail.
#[inline]
pub fn downcast_event<E: Event>(event: &BoxedEvent) -> Option<&E> {
    (**event).as_any().downcast_ref::<E>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bus_events::{ThumbnailFinishedEvent, ThumbnailRequestEvent};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_subscriber_sees_request_immediately() {
        let bus = EventBus::new();
        let frames_seen = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&frames_seen);

        bus.subscribe::<ThumbnailRequestEvent, _>(move |e| {
            seen.fetch_add(e.frames.len(), Ordering::SeqCst);
        });

        bus.emit(ThumbnailRequestEvent {
            clip_id: "clip-a".into(),
            frames: vec![0, 5, 9],
        });
        assert_eq!(frames_seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_poll_drains_in_order() {
        let bus = EventBus::new();
        bus.emit(ThumbnailFinishedEvent("a".into()));
        bus.emit(ThumbnailFinishedEvent("b".into()));
        bus.emit(ThumbnailRequestEvent { clip_id: "c".into(), frames: vec![1] });

        let events = bus.poll();
        assert_eq!(events.len(), 3);
        let first = downcast_event::<ThumbnailFinishedEvent>(&events[0]).unwrap();
        assert_eq!(first.0, "a");
        assert!(downcast_event::<ThumbnailFinishedEvent>(&events[2]).is_none());
        assert_eq!(bus.poll().len(), 0);
    }

    #[test]
    fn test_emitter_shares_queue() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        bus.subscribe::<ThumbnailFinishedEvent, _>(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        BusEmitter::from_emitter(bus.emitter()).emit(ThumbnailFinishedEvent("x".into()));
        BusEmitter::dummy().emit(ThumbnailFinishedEvent("y".into()));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.queue_len(), 1);
    }

    #[test]
    fn test_unsubscribe_keeps_queueing() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        bus.subscribe::<ThumbnailFinishedEvent, _>(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        bus.unsubscribe_all::<ThumbnailFinishedEvent>();
        bus.emit(ThumbnailFinishedEvent("x".into()));

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(bus.poll().len(), 1);
    }
}
