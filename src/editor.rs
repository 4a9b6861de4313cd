//! Editor controller - owns the sequence view and routes events.
//!
//! Data flow:
//! - document changes (`open`, `pump`) reconcile the containers and create
//!   slice widgets, with the thumbnail queue frozen so the whole burst turns
//!   into one flush
//! - pointer events go to the reorder engine; drops and relevant clicks are
//!   written back to the sequence document (`do_reorder`)
//! - `tick` drives auto-scroll and the thumbnail stall policy
//! - worker completion notices are collected by a bus subscription and
//!   handed to the queue in `pump`, so queue eviction cannot lose one
//!
//! Time comes from the host: `tick`, `pointer_move` and `pump` advance the
//! editor clock, and every queue dispatch is stamped with it.

use log::{debug, error, info, trace, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::config::EditorConfig;
use crate::core::bus_events::ThumbnailFinishedEvent;
use crate::core::event_bus::{BusEmitter, EventBus};
use crate::core::thumb_queue::{ThumbnailQueue, ThumbnailQueueHandle};
use crate::entities::{
    ClipId, Document, DocumentStore, SequenceDoc, SliceDoc, SliceId, StoreError, ThumbnailStore,
};
use crate::widgets::slice::{FramePoint, SliceWidget};
use crate::widgets::strip::{
    Containers, Point2, ReorderEngine, ReorderOutcome, SequenceCommittedEvent, StripGeometry,
};

/// Broken editor invariant (programming error, not user error)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyError {
    OrderMismatch {
        visual: Vec<SliceId>,
        committed: Vec<SliceId>,
    },
    DuplicateIds(Vec<SliceId>),
}

impl std::fmt::Display for ConsistencyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsistencyError::OrderMismatch { visual, committed } => {
                write!(f, "Strip order {:?} differs from committed {:?}", visual, committed)
            }
            ConsistencyError::DuplicateIds(ids) => write!(f, "Slices shown twice: {:?}", ids),
        }
    }
}

impl std::error::Error for ConsistencyError {}

pub struct Editor<S: DocumentStore> {
    config: EditorConfig,
    session: S,
    bus: EventBus,
    queue: ThumbnailQueueHandle,
    containers: Containers,
    engine: ReorderEngine,
    slices: HashMap<SliceId, SliceWidget>,
    /// Last committed (or received) sequence document
    sequence: Option<SequenceDoc>,
    selected: Option<SliceId>,
    /// Clips whose worker batch finished since the last pump
    completions: Arc<Mutex<Vec<ClipId>>>,
    /// Latest time reported by the host
    clock: Instant,
}

impl<S: DocumentStore> Editor<S> {
    pub fn new(config: EditorConfig, session: S, thumbs: Arc<dyn ThumbnailStore>, bus: EventBus) -> Self {
        let emitter = BusEmitter::from_emitter(bus.emitter());
        let queue = ThumbnailQueueHandle::new(
            ThumbnailQueue::new(config.thumbnails.clone(), thumbs),
            emitter.clone(),
        );
        let completions = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&completions);
        bus.subscribe::<ThumbnailFinishedEvent, _>(move |done| {
            sink.lock().unwrap_or_else(|e| e.into_inner()).push(done.0.clone());
        });
        Self {
            containers: Containers::new(config.geometry),
            engine: ReorderEngine::new(config.strip.clone(), emitter),
            config,
            session,
            bus,
            queue,
            slices: HashMap::new(),
            sequence: None,
            selected: None,
            completions,
            clock: Instant::now(),
        }
    }

    // ========== Accessors ==========

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn queue(&self) -> &ThumbnailQueueHandle {
        &self.queue
    }

    pub fn containers(&self) -> &Containers {
        &self.containers
    }

    pub fn engine(&self) -> &ReorderEngine {
        &self.engine
    }

    pub fn sequence(&self) -> Option<&SequenceDoc> {
        self.sequence.as_ref()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn slice(&self, id: &str) -> Option<&SliceWidget> {
        self.slices.get(id)
    }

    pub fn clock(&self) -> Instant {
        self.clock
    }

    /// Move the editor clock forward; earlier times are ignored.
    fn advance(&mut self, now: Instant) {
        if now > self.clock {
            self.clock = now;
        }
    }

    /// Host reports a new layout measurement.
    pub fn set_geometry(&mut self, geometry: StripGeometry) {
        self.containers.geometry = geometry;
        let w = self.config.strip.item_width;
        self.containers.scroll_to(self.containers.scroll_x(), w);
    }

    // ========== Documents ==========

    /// Load and subscribe to a sequence document.
    pub fn open(&mut self, sequence_id: &str) -> Result<(), StoreError> {
        let doc = self.session.get_sequence(sequence_id)?;
        self.session.subscribe(sequence_id);
        info!(
            "Opened sequence {}: {} in strip, {} in bucket",
            sequence_id,
            doc.src.len(),
            doc.doodle.len()
        );
        self.on_sequence_change(doc);
        Ok(())
    }

    /// Reconcile the view against a sequence document revision.
    pub fn on_sequence_change(&mut self, doc: SequenceDoc) {
        let doc = match doc.check_distinct() {
            Ok(()) => doc,
            Err(e) => {
                warn!("Sequence {}: {}, keeping first occurrences", doc.id, e);
                doc.deduplicated()
            }
        };
        if self.engine.is_active() {
            // The gesture's containers are about to be rewritten
            self.engine.abort(&mut self.containers);
        }

        self.queue.freeze();
        let ids: Vec<SliceId> = doc
            .src
            .iter()
            .cloned()
            .chain(doc.doodle.iter().map(|e| e.id.clone()))
            .collect();
        for id in &ids {
            self.ensure_slice(id);
        }
        let dropped = self.containers.reconcile(&doc.src, &doc.doodle);
        for id in &dropped {
            debug!("Slice {} left the sequence", id);
            self.slices.remove(id);
        }
        let w = self.config.strip.item_width;
        self.containers.scroll_to(self.containers.scroll_x(), w);

        let selected = doc.selected.clone();
        self.sequence = Some(doc);
        self.select(selected.as_deref());
        self.queue.unfreeze(self.clock);
        self.check_consistency();
    }

    pub fn on_slice_change(&mut self, doc: SliceDoc) {
        match self.slices.get_mut(&doc.id) {
            Some(widget) => widget.on_change(doc, Some(self.clock)),
            None => trace!("Change for slice {} not shown", doc.id),
        }
    }

    fn ensure_slice(&mut self, id: &str) {
        if self.slices.contains_key(id) {
            return;
        }
        match self.session.get_slice(id) {
            Ok(doc) => {
                if let Ok(clip) = self.session.get_clip(&doc.src) {
                    if let Err(e) = doc.validate(clip.frames) {
                        warn!("Slice {}: {}", id, e);
                    }
                }
                self.session.subscribe(id);
                self.slices.insert(id.to_string(), SliceWidget::new(doc, &self.queue));
            }
            Err(e) => warn!("Slice {} unresolved, shown without thumbnails: {}", id, e),
        }
    }

    /// Write the current containers and selection into the sequence document and commit.
    pub fn do_reorder(&mut self) {
        let Some(doc) = self.sequence.as_mut() else {
            warn!("do_reorder without an open sequence");
            return;
        };
        let order = self.containers.final_order();
        doc.src = order.sequence;
        doc.doodle = order.bucket;
        doc.selected = self.selected.clone();
        debug!("do_reorder: {:?}", doc.src);

        let committed = SequenceCommittedEvent {
            sequence_id: doc.id.clone(),
            src: doc.src.clone(),
        };
        self.session.save(Document::Sequence(doc.clone()));
        self.session.commit();
        self.bus.emit(committed);
    }

    /// Go back to the last committed document.
    fn restore(&mut self) {
        if let Some(doc) = self.sequence.clone() {
            info!("Restoring sequence {} after aborted gesture", doc.id);
            self.on_sequence_change(doc);
        }
    }

    // ========== Selection ==========

    /// Select a slice (or nothing) and scroll it into view if it is in the strip.
    pub fn select(&mut self, id: Option<&str>) {
        self.selected = id.filter(|id| self.containers.zone_of(id).is_some()).map(str::to_string);
        if let Some(i) = self.selected.as_deref().and_then(|id| self.containers.strip_index(id)) {
            self.scroll_into_view(i);
        }
    }

    fn scroll_into_view(&mut self, index: usize) {
        let w = self.config.strip.item_width;
        let client = self.containers.geometry.client_width;
        if !(w.is_finite() && w > 0.0 && client.is_finite() && client > 0.0) {
            return;
        }
        let left = index as f32 * w;
        let scroll = self.containers.scroll_x();
        if left < scroll {
            trace!("Scrolling left to {}", left);
            self.containers.scroll_to(left, w);
        } else if left + w > scroll + client {
            trace!("Scrolling right to {}", left + w - client);
            self.containers.scroll_to(left + w - client, w);
        }
    }

    // ========== Pointer ==========

    /// Pointer-down on a slice: selects it and arms a gesture.
    pub fn pointer_down(&mut self, pointer: Point2, id: &str) -> bool {
        if self.engine.is_active() {
            return false;
        }
        self.select(Some(id));
        match self.slices.get(id) {
            Some(widget) => widget.begin_drag(&mut self.engine, &self.containers, pointer),
            None => self.engine.begin(&self.containers, pointer, id),
        }
    }

    pub fn pointer_move(&mut self, pointer: Point2, now: Instant) -> ReorderOutcome {
        self.advance(now);
        let outcome = self.engine.pointer_move(&mut self.containers, pointer, now);
        self.settle(&outcome);
        outcome
    }

    pub fn pointer_up(&mut self, pointer: Point2) -> ReorderOutcome {
        let outcome = self.engine.pointer_up(&mut self.containers, pointer);
        self.settle(&outcome);
        outcome
    }

    /// Timers: auto-scroll fires and the thumbnail stall timeout.
    pub fn tick(&mut self, now: Instant) -> ReorderOutcome {
        self.advance(now);
        let outcome = self.engine.tick(&mut self.containers, now);
        self.settle(&outcome);
        self.queue.expire_stalled(self.clock);
        outcome
    }

    fn settle(&mut self, outcome: &ReorderOutcome) {
        match outcome {
            ReorderOutcome::Cancelled { raised } => {
                let committed = self.sequence.as_ref().and_then(|d| d.selected.as_deref());
                if *raised || committed != self.selected.as_deref() {
                    self.do_reorder();
                }
            }
            ReorderOutcome::Dropped(_) => self.do_reorder(),
            ReorderOutcome::Aborted => self.restore(),
            _ => return,
        }
        self.check_consistency();
    }

    /// Trim a slice end with the wheel; saves and commits on change.
    pub fn wheel(&mut self, id: &str, point: FramePoint, delta_y: f32, shift: bool) -> bool {
        let Some(widget) = self.slices.get_mut(id) else {
            return false;
        };
        let frames = match self.session.get_clip(&widget.doc().src) {
            Ok(clip) => clip.frames,
            Err(e) => {
                warn!("Cannot trim {}: {}", id, e);
                return false;
            }
        };
        if !widget.wheel(point, delta_y, shift, frames, self.clock) {
            return false;
        }
        self.session.save(Document::Slice(widget.doc().clone()));
        self.session.commit();
        true
    }

    // ========== Inbound ==========

    /// Deliver worker completions and document notifications at `now`.
    /// Returns how many were handled. The bus queue is drained as well.
    pub fn pump(&mut self, now: Instant) -> usize {
        self.advance(now);
        let mut handled = 0;
        let finished = std::mem::take(&mut *self.completions.lock().unwrap_or_else(|e| e.into_inner()));
        for clip_id in finished {
            debug!("Thumbnails finished for {}", clip_id);
            self.queue.on_fetch_completed(&clip_id, self.clock);
            handled += 1;
        }
        let drained = self.bus.poll().len();
        trace!("Drained {} bus events", drained);
        for doc in self.session.take_changes() {
            match doc {
                Document::Sequence(seq) if self.sequence.as_ref().is_some_and(|s| s.id == seq.id) => {
                    self.on_sequence_change(seq);
                    handled += 1;
                }
                Document::Slice(slice) => {
                    self.on_slice_change(slice);
                    handled += 1;
                }
                other => trace!("Ignoring change to {}", other.id()),
            }
        }
        handled
    }

    // ========== Invariants ==========

    /// Strip order equals the committed order and no slice is shown twice.
    pub fn verify(&self) -> Result<(), ConsistencyError> {
        let dupes = self.containers.duplicate_ids();
        if !dupes.is_empty() {
            return Err(ConsistencyError::DuplicateIds(dupes));
        }
        if let Some(doc) = &self.sequence {
            if !self.containers.visual_matches(&doc.src) {
                return Err(ConsistencyError::OrderMismatch {
                    visual: self.containers.strip_ids().to_vec(),
                    committed: doc.src.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_consistency(&self) {
        if let Err(e) = self.verify() {
            error!("Editor state inconsistent: {}", e);
            if cfg!(debug_assertions) {
                panic!("Editor state inconsistent: {}", e);
            }
        }
    }
}
