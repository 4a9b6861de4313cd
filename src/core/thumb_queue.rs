//! Bounded thumbnail fetch queue.
//!
//! Frame widgets ask for `(clip, frame)` thumbnails. Requests are keyed by
//! requester inside a per-clip pending map, so a widget that changes its index
//! before being served replaces its old request instead of adding one.
//!
//! Structure:
//! - `docs`: clip -> metadata snapshot (which frames already exist)
//! - `pending`: clip -> (requester -> frame), insertion ordered
//! - `in_flight`: clip -> batch sent to the worker, at most one per clip
//!
//! `flush()` serves what the snapshots already cover and turns the rest of a
//! clip's requests into one `FetchBatch`, never exceeding `max_in_flight`
//! batches overall. `on_fetch_completed()` refreshes the clip's snapshot,
//! serves what arrived, re-queues what did not and flushes again. Nothing
//! polls: flushing happens on completions and explicit calls only.
//!
//! Every call that may dispatch takes the caller's `now`. A batch is stamped
//! with it and `expire_stalled(now)` measures against the same clock.
//!
//! The queue itself is plain single-threaded state returning a `Dispatch`
//! (batches to send, requesters to redraw). `ThumbnailQueueHandle` wraps it in
//! a mutex and publishes the dispatch on the bus after unlocking.

use indexmap::IndexMap;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::core::bus_events::{ThumbnailReadyEvent, ThumbnailRequestEvent};
use crate::core::event_bus::BusEmitter;
use crate::entities::{ClipId, ThumbDoc, ThumbnailStore};

/// Identity of a frame widget asking for thumbnails
pub type RequesterId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum batches awaiting completion at once
    pub max_in_flight: usize,
    /// Release a batch's slot if no completion arrived within this time
    pub stall_timeout_ms: Option<u64>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 5,
            stall_timeout_ms: Some(30_000),
        }
    }
}

/// One grouped request for a clip, in flight until its completion notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchBatch {
    pub clip_id: ClipId,
    /// Ascending, distinct
    pub frames: Vec<usize>,
    pub requesters: Vec<RequesterId>,
}

impl FetchBatch {
    fn from_requests(clip_id: &str, requests: &IndexMap<RequesterId, usize>) -> Self {
        let mut frames: Vec<usize> = requests.values().copied().collect();
        frames.sort_unstable();
        frames.dedup();
        Self {
            clip_id: clip_id.to_string(),
            frames,
            requesters: requests.keys().copied().collect(),
        }
    }
}

/// Thumbnail currently bound to a requester
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub clip_id: ClipId,
    pub frame: usize,
    pub url: String,
}

/// Side effects of a queue operation, for the caller to publish.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Dispatch {
    pub batches: Vec<FetchBatch>,
    pub ready: Vec<ThumbnailReadyEvent>,
}

impl Dispatch {
    fn merge(&mut self, other: Dispatch) {
        self.batches.extend(other.batches);
        self.ready.extend(other.ready);
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty() && self.ready.is_empty()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Served straight from a snapshot on enqueue
    pub immediate: u64,
    /// Served during flush or completion
    pub serviced: u64,
    pub batches: u64,
    /// Requests still missing after a completion
    pub requeued: u64,
    /// Batches whose slot was released by the stall timeout
    pub expired: u64,
}

#[derive(Debug)]
struct InFlight {
    batch: FetchBatch,
    sent_at: Instant,
}

pub struct ThumbnailQueue {
    config: QueueConfig,
    store: Arc<dyn ThumbnailStore>,
    docs: HashMap<ClipId, ThumbDoc>,
    pending: IndexMap<ClipId, IndexMap<RequesterId, usize>>,
    in_flight: IndexMap<ClipId, InFlight>,
    bindings: HashMap<RequesterId, Thumbnail>,
    freeze_depth: u32,
    stats: QueueStats,
}

impl std::fmt::Debug for ThumbnailQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThumbnailQueue")
            .field("config", &self.config)
            .field("pending_clips", &self.pending.len())
            .field("in_flight", &self.in_flight.len())
            .field("freeze_depth", &self.freeze_depth)
            .finish()
    }
}

impl ThumbnailQueue {
    pub fn new(mut config: QueueConfig, store: Arc<dyn ThumbnailStore>) -> Self {
        // A zero cap would park every request forever
        config.max_in_flight = config.max_in_flight.max(1);
        debug!(
            "ThumbnailQueue created: max_in_flight={}, stall_timeout={:?}ms",
            config.max_in_flight, config.stall_timeout_ms
        );
        Self {
            config,
            store,
            docs: HashMap::new(),
            pending: IndexMap::new(),
            in_flight: IndexMap::new(),
            bindings: HashMap::new(),
            freeze_depth: 0,
            stats: QueueStats::default(),
        }
    }

    // ========== Snapshots ==========

    fn load_snapshot(&self, clip_id: &str) -> ThumbDoc {
        match self.store.get(clip_id) {
            Ok(doc) => doc,
            Err(e) => {
                // Nothing known yet; requests fall through to the worker
                debug!("No thumbnail doc for {}: {}", clip_id, e);
                ThumbDoc::empty(clip_id)
            }
        }
    }

    fn refresh(&mut self, clip_id: &str) {
        let doc = self.load_snapshot(clip_id);
        self.docs.insert(clip_id.to_string(), doc);
    }

    /// Whether the clip's snapshot lists `frame`, loading the snapshot on first use.
    pub fn has_frame(&mut self, clip_id: &str, frame: usize) -> bool {
        if !self.docs.contains_key(clip_id) {
            self.refresh(clip_id);
        }
        self.docs.get(clip_id).is_some_and(|doc| doc.has_frame(frame))
    }

    fn service(&mut self, requester: RequesterId, clip_id: &str, frame: usize) -> ThumbnailReadyEvent {
        let url = self.store.attachment_url(clip_id, frame);
        trace!("Serve {} frame {} -> {}", clip_id, frame, requester);
        self.bindings.insert(
            requester,
            Thumbnail {
                clip_id: clip_id.to_string(),
                frame,
                url,
            },
        );
        ThumbnailReadyEvent {
            requester,
            clip_id: clip_id.to_string(),
            frame,
        }
    }

    fn remove_pending(&mut self, requester: RequesterId, clip_id: &str) {
        if let Some(requests) = self.pending.get_mut(clip_id) {
            requests.shift_remove(&requester);
            if requests.is_empty() {
                self.pending.shift_remove(clip_id);
            }
        }
    }

    // ========== Operations ==========

    /// Register interest of `requester` in `frame` of `clip_id`.
    ///
    /// Served immediately if the snapshot already has the frame; otherwise
    /// replaces any earlier unserved request of the same requester.
    pub fn enqueue(&mut self, requester: RequesterId, clip_id: &str, frame: usize) -> Dispatch {
        if self.has_frame(clip_id, frame) {
            self.remove_pending(requester, clip_id);
            self.stats.immediate += 1;
            return Dispatch {
                batches: Vec::new(),
                ready: vec![self.service(requester, clip_id, frame)],
            };
        }
        let previous = self
            .pending
            .entry(clip_id.to_string())
            .or_default()
            .insert(requester, frame);
        if let Some(old) = previous {
            trace!("Requester {} replaced frame {} with {} for {}", requester, old, frame, clip_id);
        }
        Dispatch::default()
    }

    /// Suppress flushing until the matching `unfreeze()`. Nests.
    pub fn freeze(&mut self) {
        self.freeze_depth += 1;
    }

    /// Leave a freeze; the outermost unfreeze performs one flush.
    pub fn unfreeze(&mut self, now: Instant) -> Dispatch {
        if self.freeze_depth == 0 {
            warn!("ThumbnailQueue: unfreeze without freeze");
            return Dispatch::default();
        }
        self.freeze_depth -= 1;
        if self.freeze_depth > 0 {
            return Dispatch::default();
        }
        self.flush(now)
    }

    pub fn is_frozen(&self) -> bool {
        self.freeze_depth > 0
    }

    /// Serve satisfiable requests and dispatch one batch per idle clip, up to the cap.
    pub fn flush(&mut self, now: Instant) -> Dispatch {
        let mut out = Dispatch::default();
        if self.is_frozen() {
            return out;
        }

        let clips: Vec<ClipId> = self.pending.keys().cloned().collect();
        for clip_id in clips {
            if self.in_flight.contains_key(&clip_id) {
                trace!("Already waiting on {}", clip_id);
                continue;
            }
            let Some(requests) = self.pending.get(&clip_id).cloned() else {
                continue;
            };

            let mut missing: IndexMap<RequesterId, usize> = IndexMap::new();
            for (requester, frame) in requests {
                if self.has_frame(&clip_id, frame) {
                    self.stats.serviced += 1;
                    out.ready.push(self.service(requester, &clip_id, frame));
                } else {
                    missing.insert(requester, frame);
                }
            }

            if missing.is_empty() {
                self.pending.shift_remove(&clip_id);
                continue;
            }

            if self.in_flight.len() >= self.config.max_in_flight {
                // Stays queued for the flush that follows the next completion
                trace!("In-flight cap reached, {} waits", clip_id);
                self.pending.insert(clip_id, missing);
                continue;
            }

            let batch = FetchBatch::from_requests(&clip_id, &missing);
            debug!("Dispatch thumbnails for {}: {:?}", clip_id, batch.frames);
            self.pending.insert(clip_id.clone(), missing);
            self.in_flight.insert(
                clip_id,
                InFlight {
                    batch: batch.clone(),
                    sent_at: now,
                },
            );
            self.stats.batches += 1;
            out.batches.push(batch);
        }
        out
    }

    /// Completion notice for `clip_id`'s batch (possibly partial).
    pub fn on_fetch_completed(&mut self, clip_id: &str, now: Instant) -> Dispatch {
        let was_waiting = self.in_flight.shift_remove(clip_id).is_some();
        let Some(waiting) = self.pending.shift_remove(clip_id) else {
            if !was_waiting {
                debug!("Completion for {} with nothing queued", clip_id);
                return Dispatch::default();
            }
            self.refresh(clip_id);
            return self.flush(now);
        };

        self.refresh(clip_id);
        let mut out = Dispatch::default();
        for (requester, frame) in waiting {
            if self.has_frame(clip_id, frame) {
                self.stats.serviced += 1;
                out.ready.push(self.service(requester, clip_id, frame));
            } else {
                self.stats.requeued += 1;
                self.pending
                    .entry(clip_id.to_string())
                    .or_default()
                    .insert(requester, frame);
            }
        }
        out.merge(self.flush(now));
        out
    }

    /// Release slots of batches older than the stall timeout and re-flush.
    ///
    /// Their requesters are still pending, so the frames are requested again.
    pub fn expire_stalled(&mut self, now: Instant) -> Dispatch {
        let Some(timeout_ms) = self.config.stall_timeout_ms else {
            return Dispatch::default();
        };
        let timeout = Duration::from_millis(timeout_ms);
        let stalled: Vec<ClipId> = self
            .in_flight
            .iter()
            .filter(|(_, f)| now.saturating_duration_since(f.sent_at) >= timeout)
            .map(|(clip, _)| clip.clone())
            .collect();
        if stalled.is_empty() {
            return Dispatch::default();
        }
        for clip_id in &stalled {
            if let Some(f) = self.in_flight.shift_remove(clip_id) {
                warn!(
                    "Thumbnail batch for {} stalled after {}ms, frames {:?} will be re-requested",
                    clip_id, timeout_ms, f.batch.frames
                );
                self.stats.expired += 1;
            }
            // Behind the clips that were waiting for a slot
            if let Some(requests) = self.pending.shift_remove(clip_id) {
                self.pending.insert(clip_id.clone(), requests);
            }
        }
        self.flush(now)
    }

    /// Drop everything known about a requester (widget destroyed).
    pub fn forget(&mut self, requester: RequesterId) {
        self.bindings.remove(&requester);
        let clips: Vec<ClipId> = self.pending.keys().cloned().collect();
        for clip_id in clips {
            self.remove_pending(requester, &clip_id);
        }
    }

    // ========== Queries ==========

    pub fn thumbnail_for(&self, requester: RequesterId) -> Option<&Thumbnail> {
        self.bindings.get(&requester)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_waiting(&self, clip_id: &str) -> bool {
        self.in_flight.contains_key(clip_id)
    }

    pub fn in_flight_batch(&self, clip_id: &str) -> Option<&FetchBatch> {
        self.in_flight.get(clip_id).map(|f| &f.batch)
    }

    pub fn pending_frame(&self, requester: RequesterId, clip_id: &str) -> Option<usize> {
        self.pending.get(clip_id).and_then(|r| r.get(&requester)).copied()
    }

    pub fn pending_clips(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> QueueStats {
        self.stats
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }
}

/// Shared handle given to frame widgets.
///
/// Serializes access to the queue and publishes each `Dispatch` on the bus
/// after the lock is released.
#[derive(Clone)]
pub struct ThumbnailQueueHandle {
    inner: Arc<Mutex<ThumbnailQueue>>,
    bus: BusEmitter,
}

impl std::fmt::Debug for ThumbnailQueueHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThumbnailQueueHandle").finish_non_exhaustive()
    }
}

impl ThumbnailQueueHandle {
    pub fn new(queue: ThumbnailQueue, bus: BusEmitter) -> Self {
        Self {
            inner: Arc::new(Mutex::new(queue)),
            bus,
        }
    }

    /// Run `f` with the queue locked.
    pub fn with<R>(&self, f: impl FnOnce(&mut ThumbnailQueue) -> R) -> R {
        let mut queue = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut queue)
    }

    fn run(&self, f: impl FnOnce(&mut ThumbnailQueue) -> Dispatch) -> Dispatch {
        let dispatch = self.with(f);
        for batch in &dispatch.batches {
            self.bus.emit(ThumbnailRequestEvent {
                clip_id: batch.clip_id.clone(),
                frames: batch.frames.clone(),
            });
        }
        for ready in &dispatch.ready {
            self.bus.emit(ready.clone());
        }
        dispatch
    }

    pub fn enqueue(&self, requester: RequesterId, clip_id: &str, frame: usize) -> Dispatch {
        self.run(|q| q.enqueue(requester, clip_id, frame))
    }

    pub fn freeze(&self) {
        self.with(|q| q.freeze());
    }

    pub fn unfreeze(&self, now: Instant) -> Dispatch {
        self.run(|q| q.unfreeze(now))
    }

    pub fn flush(&self, now: Instant) -> Dispatch {
        self.run(|q| q.flush(now))
    }

    pub fn on_fetch_completed(&self, clip_id: &str, now: Instant) -> Dispatch {
        self.run(|q| q.on_fetch_completed(clip_id, now))
    }

    pub fn expire_stalled(&self, now: Instant) -> Dispatch {
        self.run(|q| q.expire_stalled(now))
    }

    pub fn forget(&self, requester: RequesterId) {
        self.with(|q| q.forget(requester));
    }

    pub fn thumbnail_for(&self, requester: RequesterId) -> Option<Thumbnail> {
        self.with(|q| q.thumbnail_for(requester).cloned())
    }

    pub fn stats(&self) -> QueueStats {
        self.with(|q| q.stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event_bus::{EventBus, downcast_event};
    use crate::entities::MemoryThumbStore;

    fn queue_with(cap: usize) -> (ThumbnailQueue, Arc<MemoryThumbStore>) {
        let store = Arc::new(MemoryThumbStore::default());
        let config = QueueConfig {
            max_in_flight: cap,
            ..Default::default()
        };
        (ThumbnailQueue::new(config, store.clone()), store)
    }

    #[test]
    fn test_cached_frame_served_on_enqueue() {
        let (mut q, store) = queue_with(5);
        store.put_frames("x", [3]);
        let r = Uuid::new_v4();

        let out = q.enqueue(r, "x", 3);
        assert_eq!(out.ready.len(), 1);
        assert!(out.batches.is_empty());
        assert_eq!(q.thumbnail_for(r).unwrap().url, "/thumbnails/x/3");
        assert_eq!(q.pending_clips(), 0);
        assert_eq!(q.stats().immediate, 1);
    }

    #[test]
    fn test_one_batch_per_clip_from_many_requesters() {
        let (mut q, _store) = queue_with(5);
        let t0 = Instant::now();
        let (r1, r2) = (Uuid::new_v4(), Uuid::new_v4());
        q.enqueue(r1, "x", 5);
        q.enqueue(r2, "x", 0);

        let out = q.flush(t0);
        assert_eq!(out.batches.len(), 1);
        assert_eq!(out.batches[0].clip_id, "x");
        assert_eq!(out.batches[0].frames, vec![0, 5]);
        assert_eq!(out.batches[0].requesters, vec![r1, r2]);
        assert!(q.is_waiting("x"));
    }

    #[test]
    fn test_latest_request_per_requester_wins() {
        let (mut q, store) = queue_with(5);
        let t0 = Instant::now();
        let r = Uuid::new_v4();
        q.enqueue(r, "x", 3);
        q.enqueue(r, "x", 7);
        assert_eq!(q.pending_frame(r, "x"), Some(7));

        let out = q.flush(t0);
        assert_eq!(out.batches[0].frames, vec![7]);

        store.put_frames("x", [3, 7]);
        let done = q.on_fetch_completed("x", t0);
        assert_eq!(done.ready.len(), 1);
        assert_eq!(done.ready[0].frame, 7);
        assert_eq!(q.thumbnail_for(r).unwrap().frame, 7);
    }

    #[test]
    fn test_no_second_batch_while_clip_in_flight() {
        let (mut q, store) = queue_with(5);
        let t0 = Instant::now();
        let (r1, r2) = (Uuid::new_v4(), Uuid::new_v4());
        q.enqueue(r1, "x", 1);
        assert_eq!(q.flush(t0).batches.len(), 1);

        q.enqueue(r2, "x", 2);
        assert!(q.flush(t0).batches.is_empty());

        store.put_frames("x", [1]);
        let out = q.on_fetch_completed("x", t0);
        assert_eq!(out.ready.len(), 1);
        assert_eq!(out.ready[0].requester, r1);
        assert_eq!(out.batches.len(), 1);
        assert_eq!(out.batches[0].frames, vec![2]);
        assert_eq!(out.batches[0].requesters, vec![r2]);
    }

    #[test]
    fn test_in_flight_cap() {
        let (mut q, store) = queue_with(5);
        let t0 = Instant::now();
        for i in 0..8 {
            q.enqueue(Uuid::new_v4(), &format!("clip{}", i), 0);
        }
        let out = q.flush(t0);
        assert_eq!(out.batches.len(), 5);
        assert_eq!(q.in_flight_count(), 5);
        assert_eq!(q.pending_clips(), 8);

        // Another flush cannot exceed the cap
        assert!(q.flush(t0).batches.is_empty());

        store.put_frames("clip0", [0]);
        let out = q.on_fetch_completed("clip0", t0);
        assert_eq!(out.ready.len(), 1);
        assert_eq!(out.batches.len(), 1);
        assert_eq!(out.batches[0].clip_id, "clip5");
        assert_eq!(q.in_flight_count(), 5);
    }

    #[test]
    fn test_completion_without_requests_is_noop() {
        let (mut q, _store) = queue_with(5);
        let t0 = Instant::now();
        assert!(q.on_fetch_completed("x", t0).is_empty());
        assert_eq!(q.in_flight_count(), 0);
    }

    #[test]
    fn test_partial_completion_requeues_missing() {
        let (mut q, store) = queue_with(5);
        let t0 = Instant::now();
        let (r1, r2) = (Uuid::new_v4(), Uuid::new_v4());
        q.enqueue(r1, "x", 0);
        q.enqueue(r2, "x", 5);
        q.flush(t0);

        store.put_frames("x", [0]);
        let out = q.on_fetch_completed("x", t0);
        assert_eq!(out.ready.len(), 1);
        assert_eq!(out.ready[0].requester, r1);
        assert_eq!(out.batches.len(), 1);
        assert_eq!(out.batches[0].frames, vec![5]);
        assert_eq!(q.stats().requeued, 1);

        store.put_frames("x", [5]);
        let out = q.on_fetch_completed("x", t0);
        assert_eq!(out.ready[0].requester, r2);
        assert!(out.batches.is_empty());
        assert_eq!(q.pending_clips(), 0);
        assert_eq!(q.in_flight_count(), 0);
    }

    #[test]
    fn test_freeze_defers_flush_until_outermost_unfreeze() {
        let (mut q, _store) = queue_with(5);
        let t0 = Instant::now();
        q.freeze();
        q.freeze();
        q.enqueue(Uuid::new_v4(), "a", 1);
        q.enqueue(Uuid::new_v4(), "b", 1);
        assert!(q.flush(t0).is_empty());
        assert!(q.unfreeze(t0).is_empty());
        assert!(q.is_frozen());

        let out = q.unfreeze(t0);
        assert_eq!(out.batches.len(), 2);
        assert!(!q.is_frozen());
    }

    #[test]
    fn test_missing_doc_counts_as_empty() {
        let (mut q, store) = queue_with(5);
        let t0 = Instant::now();
        assert!(!q.has_frame("ghost", 0));
        q.enqueue(Uuid::new_v4(), "ghost", 0);
        assert_eq!(q.flush(t0).batches.len(), 1);

        // Document appears once the worker produced it
        store.put_frames("ghost", [0]);
        assert_eq!(q.on_fetch_completed("ghost", t0).ready.len(), 1);
    }

    #[test]
    fn test_stalled_batch_released_and_resent() {
        let (mut q, _store) = queue_with(1);
        let t0 = Instant::now();
        q.enqueue(Uuid::new_v4(), "x", 1);
        q.enqueue(Uuid::new_v4(), "y", 1);
        let first = q.flush(t0);
        assert_eq!(first.batches.len(), 1);
        assert_eq!(first.batches[0].clip_id, "x");

        assert!(q.expire_stalled(t0).is_empty());

        let out = q.expire_stalled(t0 + Duration::from_secs(31));
        assert_eq!(out.batches.len(), 1);
        assert_eq!(out.batches[0].clip_id, "y");
        assert_eq!(q.stats().expired, 1);
        assert_eq!(q.in_flight_count(), 1);
    }

    #[test]
    fn test_stall_age_measured_from_dispatch_time() {
        let (mut q, _store) = queue_with(5);
        let t0 = Instant::now();
        q.enqueue(Uuid::new_v4(), "x", 1);

        // Dispatched at a caller time well past the queue's creation
        let sent = t0 + Duration::from_secs(40);
        assert_eq!(q.flush(sent).batches.len(), 1);

        assert!(q.expire_stalled(sent + Duration::from_millis(1)).is_empty());
        assert!(q.expire_stalled(sent + Duration::from_millis(29_999)).is_empty());
        assert_eq!(q.stats().expired, 0);
        assert!(q.is_waiting("x"));

        let out = q.expire_stalled(sent + Duration::from_secs(30));
        assert_eq!(out.batches.len(), 1);
        assert_eq!(out.batches[0].frames, vec![1]);
        assert_eq!(q.stats().expired, 1);

        // The re-sent batch carries the new dispatch time
        let resent = sent + Duration::from_secs(30);
        assert!(q.expire_stalled(resent + Duration::from_millis(1)).is_empty());
        assert_eq!(q.stats().expired, 1);
    }

    #[test]
    fn test_forget_drops_requests() {
        let (mut q, _store) = queue_with(5);
        let t0 = Instant::now();
        let r = Uuid::new_v4();
        q.enqueue(r, "x", 1);
        q.forget(r);
        assert_eq!(q.pending_clips(), 0);
        assert!(q.flush(t0).is_empty());
    }

    #[test]
    fn test_handle_publishes_after_unlock() {
        let bus = EventBus::new();
        let store = Arc::new(MemoryThumbStore::default());
        let handle = ThumbnailQueueHandle::new(
            ThumbnailQueue::new(QueueConfig::default(), store.clone()),
            BusEmitter::from_emitter(bus.emitter()),
        );

        // A subscriber touching the queue must not deadlock
        let watcher = handle.clone();
        bus.subscribe::<ThumbnailRequestEvent, _>(move |_| {
            let _ = watcher.stats();
        });

        handle.enqueue(Uuid::new_v4(), "x", 4);
        handle.flush(Instant::now());

        let events = bus.poll();
        assert_eq!(events.len(), 1);
        let sent = downcast_event::<ThumbnailRequestEvent>(&events[0]).unwrap();
        assert_eq!(sent.frames, vec![4]);
    }
}
