//! Reorder engine - drag state machine for strip and bucket.
//!
//! One gesture at a time: `Idle -> Pressed -> Dragging -> Idle`. The engine
//! works on a `Containers` borrowed per call and never owns order state, so
//! the strip vector stays the single source of truth.
//!
//! While dragging inside the strip the dragged slice keeps its original
//! position in the vector; only its logical slot (`index`) moves, and the
//! neighbours it passes get `Left`/`Right` markers. The vector is spliced
//! once, on drop. Crossing between strip and bucket moves the id physically
//! and restarts the slot bookkeeping.

use log::{debug, trace, warn};
use std::time::Instant;

use super::strip::{Containers, FinalOrder, Marker, OverMarker, Point2, StripConfig, Zone};
use super::strip_events::{
    SliceDragCancelledEvent, SliceDragStartedEvent, SliceDraggedEvent, SliceDroppedEvent,
};
use super::strip_helpers::{self, ScrollDir, Shift};
use crate::core::event_bus::BusEmitter;
use crate::core::repeat_timer::RepeatTimer;
use crate::entities::{BucketEntry, SliceId};

/// Press recorded on pointer-down
#[derive(Clone, Debug)]
pub struct Gesture {
    pub item: SliceId,
    pub origin_zone: Zone,
    /// Pointer at press, viewport-clamped
    pub origin: Point2,
    /// Pointer offset inside the item at press
    pub grab: Point2,
}

/// Drag past the threshold
#[derive(Clone, Debug)]
pub struct ActiveDrag {
    gesture: Gesture,
    pointer: Point2,
    zone: Zone,
    /// Grab offset rescaled to the item size of `zone`
    offset: Point2,
    /// Live slot in the strip. The child at this position is the reference
    /// the next shift walks from.
    index: usize,
    /// Strip position of the dragged slice when it started or entered
    orig_index: usize,
    autoscroll: RepeatTimer<ScrollDir>,
}

impl ActiveDrag {
    /// Left edge of the dragged element in client coordinates
    fn left(&self) -> f32 {
        self.pointer.x - self.offset.x
    }

    fn top(&self) -> f32 {
        self.pointer.y - self.offset.y
    }
}

#[derive(Clone, Debug, Default)]
pub enum DragPhase {
    #[default]
    Idle,
    Pressed(Gesture),
    Dragging(Box<ActiveDrag>),
}

/// Result of feeding one event to the engine
#[derive(Clone, Debug, PartialEq)]
pub enum ReorderOutcome {
    /// Nothing to report for this event
    Unchanged,
    Started,
    Moved { zone: Zone, index: Option<usize> },
    /// Released below the drag threshold; `raised` if the bucket order changed
    Cancelled { raised: bool },
    Dropped(FinalOrder),
    /// Gesture abandoned; the caller reconciles to the committed document
    Aborted,
}

#[derive(Debug)]
pub struct ReorderEngine {
    config: StripConfig,
    phase: DragPhase,
    bus: BusEmitter,
}

impl ReorderEngine {
    pub fn new(config: StripConfig, bus: BusEmitter) -> Self {
        Self {
            config,
            phase: DragPhase::Idle,
            bus,
        }
    }

    pub fn config(&self) -> &StripConfig {
        &self.config
    }

    pub fn phase(&self) -> &DragPhase {
        &self.phase
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.phase, DragPhase::Idle)
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, DragPhase::Dragging(_))
    }

    pub fn dragged_item(&self) -> Option<&str> {
        match &self.phase {
            DragPhase::Idle => None,
            DragPhase::Pressed(g) => Some(&g.item),
            DragPhase::Dragging(d) => Some(&d.gesture.item),
        }
    }

    /// Current zone and, over the strip, the live slot.
    pub fn current_slot(&self) -> Option<(Zone, Option<usize>)> {
        match &self.phase {
            DragPhase::Dragging(d) => Some((d.zone, (d.zone == Zone::Strip).then_some(d.index))),
            _ => None,
        }
    }

    pub fn autoscroll_active(&self) -> bool {
        match &self.phase {
            DragPhase::Dragging(d) => d.autoscroll.is_active(),
            _ => false,
        }
    }

    // ========== Transitions ==========

    /// Pointer-down on `item`. Returns false if the item is unknown or a
    /// gesture is already running.
    pub fn begin(&mut self, c: &Containers, pointer: Point2, item: &str) -> bool {
        if self.is_active() {
            warn!("ReorderEngine: press on {} while a gesture is active, ignored", item);
            return false;
        }
        let Some(origin_zone) = c.zone_of(item) else {
            debug!("ReorderEngine: press on unknown item {}", item);
            return false;
        };
        let Some(pos) = c.element_position(item, self.config.item_width) else {
            return false;
        };
        let origin = strip_helpers::clamp_to_viewport(pointer, c.geometry.viewport);
        trace!("Press {} in {:?} at ({}, {})", item, origin_zone, origin.x, origin.y);
        self.phase = DragPhase::Pressed(Gesture {
            item: item.to_string(),
            origin_zone,
            origin,
            grab: origin - pos,
        });
        true
    }

    pub fn pointer_move(&mut self, c: &mut Containers, pointer: Point2, now: Instant) -> ReorderOutcome {
        let pointer = strip_helpers::clamp_to_viewport(pointer, c.geometry.viewport);
        match std::mem::take(&mut self.phase) {
            DragPhase::Idle => ReorderOutcome::Unchanged,
            DragPhase::Pressed(gesture) => {
                let d = pointer - gesture.origin;
                if d.x.abs().max(d.y.abs()) <= self.config.drag_threshold {
                    self.phase = DragPhase::Pressed(gesture);
                    return ReorderOutcome::Unchanged;
                }
                let Some(zone) = c.zone_of(&gesture.item) else {
                    return self.vanished(c, &gesture.item);
                };
                let mut drag = self.start_drag(c, gesture, zone, pointer);
                self.bus.emit(SliceDragStartedEvent(drag.gesture.item.clone()));
                self.update(c, &mut drag, now);
                self.emit_dragged(&drag);
                self.phase = DragPhase::Dragging(drag);
                ReorderOutcome::Started
            }
            DragPhase::Dragging(mut drag) => {
                if c.zone_of(&drag.gesture.item).is_none() {
                    return self.vanished(c, &drag.gesture.item);
                }
                drag.pointer = pointer;
                self.update(c, &mut drag, now);
                let outcome = self.emit_dragged(&drag);
                self.phase = DragPhase::Dragging(drag);
                outcome
            }
        }
    }

    /// Auto-scroll re-entry: scroll one item per due fire and re-settle the slot.
    pub fn tick(&mut self, c: &mut Containers, now: Instant) -> ReorderOutcome {
        let mut drag = match std::mem::take(&mut self.phase) {
            DragPhase::Dragging(drag) => drag,
            other => {
                self.phase = other;
                return ReorderOutcome::Unchanged;
            }
        };
        if c.zone_of(&drag.gesture.item).is_none() {
            return self.vanished(c, &drag.gesture.item);
        }
        let fired = if drag.zone == Zone::Strip { drag.autoscroll.tick(now) } else { None };
        let Some((dir, fires)) = fired else {
            self.phase = DragPhase::Dragging(drag);
            return ReorderOutcome::Unchanged;
        };

        let w = self.config.item_width;
        for _ in 0..fires {
            if c.scroll_by(dir.sign() * w, w) == 0.0 {
                break;
            }
        }
        trace!("Auto-scroll {:?} x{} -> {}", dir, fires, c.scroll_x());
        self.settle_slot(c, &mut drag);
        self.update_autoscroll(c, &mut drag, now);
        let outcome = self.emit_dragged(&drag);
        self.phase = DragPhase::Dragging(drag);
        outcome
    }

    pub fn pointer_up(&mut self, c: &mut Containers, pointer: Point2) -> ReorderOutcome {
        let pointer = strip_helpers::clamp_to_viewport(pointer, c.geometry.viewport);
        match std::mem::take(&mut self.phase) {
            DragPhase::Idle => ReorderOutcome::Unchanged,
            DragPhase::Pressed(gesture) => {
                // Plain click: only the bucket stacking may change
                let raised = c.zone_of(&gesture.item) == Some(Zone::Bucket)
                    && c.raise_in_bucket(&gesture.item);
                debug!("Click on {} (raised: {})", gesture.item, raised);
                self.bus.emit(SliceDragCancelledEvent {
                    id: gesture.item,
                    raised,
                });
                ReorderOutcome::Cancelled { raised }
            }
            DragPhase::Dragging(mut drag) => {
                drag.autoscroll.cancel();
                drag.pointer = pointer;
                let id = drag.gesture.item.clone();
                let Some(zone) = c.zone_of(&id) else {
                    return self.vanished(c, &id);
                };
                Self::clear_decorations(c);

                match zone {
                    Zone::Bucket => {
                        c.raise_in_bucket(&id);
                        c.set_bucket_pos(&id, Point2::new(drag.left(), drag.top()));
                    }
                    Zone::Strip => {
                        let from = c.strip_index(&id).unwrap_or(drag.orig_index);
                        if from != drag.orig_index {
                            debug!("{} found at {} instead of {}", id, from, drag.orig_index);
                        }
                        debug!("Drop {}: {} => {}", id, from, drag.index);
                        c.move_in_strip(from, drag.index);
                    }
                }

                let order = c.final_order();
                self.bus.emit(SliceDroppedEvent {
                    id,
                    order: order.clone(),
                });
                ReorderOutcome::Dropped(order)
            }
        }
    }

    /// Abandon the gesture without touching the order.
    pub fn abort(&mut self, c: &mut Containers) -> ReorderOutcome {
        match std::mem::take(&mut self.phase) {
            DragPhase::Idle => ReorderOutcome::Unchanged,
            DragPhase::Pressed(g) => {
                debug!("Press on {} aborted", g.item);
                ReorderOutcome::Aborted
            }
            DragPhase::Dragging(mut d) => {
                d.autoscroll.cancel();
                Self::clear_decorations(c);
                warn!("Drag of {} aborted", d.gesture.item);
                ReorderOutcome::Aborted
            }
        }
    }

    // ========== Drag mechanics ==========

    fn vanished(&mut self, c: &mut Containers, id: &str) -> ReorderOutcome {
        warn!("Dragged slice {} disappeared, aborting gesture", id);
        self.phase = DragPhase::Idle;
        Self::clear_decorations(c);
        ReorderOutcome::Aborted
    }

    fn clear_decorations(c: &mut Containers) {
        c.set_grabbed(None);
        c.clear_over();
        c.clear_markers();
    }

    fn emit_dragged(&self, drag: &ActiveDrag) -> ReorderOutcome {
        let index = (drag.zone == Zone::Strip).then_some(drag.index);
        self.bus.emit(SliceDraggedEvent {
            id: drag.gesture.item.clone(),
            zone: drag.zone,
            index,
        });
        ReorderOutcome::Moved {
            zone: drag.zone,
            index,
        }
    }

    fn start_drag(&self, c: &mut Containers, gesture: Gesture, zone: Zone, pointer: Point2) -> Box<ActiveDrag> {
        c.set_grabbed(Some(&gesture.item));
        let mut index = 0;
        let strip_pos = if zone == Zone::Strip { c.strip_index(&gesture.item) } else { None };
        if let Some(i) = strip_pos {
            index = i;
            let ids = c.strip_ids();
            let over = match (ids.get(i + 1), i.checked_sub(1).and_then(|p| ids.get(p))) {
                (Some(next), _) => Some((next.clone(), OverMarker::Over)),
                (None, Some(prev)) => Some((prev.clone(), OverMarker::OverRight)),
                (None, None) => None,
            };
            if let Some((id, marker)) = over {
                c.set_over(&id, marker);
            }
        }
        debug!("Drag start {} from {:?} at {}", gesture.item, zone, index);
        Box::new(ActiveDrag {
            offset: gesture.grab,
            gesture,
            pointer,
            zone,
            index,
            orig_index: index,
            autoscroll: RepeatTimer::new(self.config.autoscroll_interval_ms),
        })
    }

    fn update(&self, c: &mut Containers, drag: &mut ActiveDrag, now: Instant) {
        let (_, height) = self.config.item_size(drag.zone);
        let next = strip_helpers::zone_for(
            drag.zone,
            drag.top(),
            c.geometry.strip_top,
            height,
            self.config.zone_fraction,
        );
        if next != drag.zone {
            match next {
                Zone::Strip => self.enter_strip(c, drag),
                Zone::Bucket => self.enter_bucket(c, drag),
            }
        }
        match drag.zone {
            Zone::Bucket => {
                let pos = Point2::new(drag.left(), drag.top());
                c.set_bucket_pos(&drag.gesture.item, pos);
                c.set_drag_pos(pos);
            }
            Zone::Strip => {
                c.set_drag_pos(Point2::new(drag.left(), c.geometry.strip_top - self.config.lift));
                self.settle_slot(c, drag);
                self.update_autoscroll(c, drag, now);
            }
        }
    }

    /// Grab offset for an item of `zone`'s size
    fn offset_for(&self, drag: &ActiveDrag, zone: Zone) -> Point2 {
        let (from_w, from_h) = self.config.item_size(drag.gesture.origin_zone);
        let (to_w, to_h) = self.config.item_size(zone);
        Point2::new(
            strip_helpers::rescale_offset(drag.gesture.grab.x, from_w, to_w),
            strip_helpers::rescale_offset(drag.gesture.grab.y, from_h, to_h),
        )
    }

    fn enter_strip(&self, c: &mut Containers, drag: &mut ActiveDrag) {
        let w = self.config.item_width;
        let id = drag.gesture.item.clone();
        c.detach(&id);
        let len = c.strip_ids().len();
        let slot = if len == 0 {
            0
        } else {
            let scroll_x = drag.left() - c.geometry.strip_left + c.scroll_x();
            match strip_helpers::slot_for(scroll_x, w, len) {
                Some(slot) => slot,
                None => {
                    // Not laid out: stay in the bucket this event
                    c.push_bucket(BucketEntry::new(id, drag.left(), drag.top()));
                    return;
                }
            }
        };

        c.clear_over();
        c.clear_markers();
        let over = if len == 0 {
            None
        } else if slot == len {
            Some((c.strip_ids()[len - 1].clone(), OverMarker::OverRight))
        } else {
            Some((c.strip_ids()[slot].clone(), OverMarker::Over))
        };
        if let Some((over_id, marker)) = over {
            c.set_over(&over_id, marker);
        }
        c.insert_strip(slot, id.clone());
        if len > 0 && slot == len {
            c.scroll_by(w, w);
        }

        drag.zone = Zone::Strip;
        drag.index = slot;
        drag.orig_index = slot;
        drag.offset = self.offset_for(drag, Zone::Strip);
        debug!("{} entered strip at {}", id, slot);
    }

    fn enter_bucket(&self, c: &mut Containers, drag: &mut ActiveDrag) {
        drag.autoscroll.cancel();
        c.clear_over();
        c.clear_markers();
        let id = drag.gesture.item.clone();
        c.detach(&id);
        drag.zone = Zone::Bucket;
        drag.offset = self.offset_for(drag, Zone::Bucket);
        c.push_bucket(BucketEntry::new(id.clone(), drag.left(), drag.top()));
        debug!("{} moved into bucket", id);
    }

    /// Shift neighbours until the element is within the hysteresis band of
    /// its slot. Stops at the strip ends and never reverses within one call.
    fn settle_slot(&self, c: &mut Containers, drag: &mut ActiveDrag) {
        let scroll_x = drag.left() - c.geometry.strip_left + c.scroll_x();
        let mut direction = None;
        while let Some(shift) =
            strip_helpers::shift_for(scroll_x, drag.index, self.config.item_width, self.config.hysteresis)
        {
            if direction.is_some_and(|d| d != shift) || !Self::shift(c, drag, shift) {
                break;
            }
            direction = Some(shift);
        }
    }

    /// Move the live slot one step, toggling the passed neighbour's marker.
    fn shift(c: &mut Containers, drag: &mut ActiveDrag, shift: Shift) -> bool {
        let ids = c.strip_ids();
        let target = drag.index;
        let Some(target_id) = ids.get(target).cloned() else {
            return false;
        };
        match shift {
            Shift::Back => {
                let Some(prev) = target.checked_sub(1).and_then(|p| ids.get(p)).cloned() else {
                    return false;
                };
                if c.marker(&target_id) == Some(Marker::Left) {
                    c.remove_marker(&target_id);
                } else {
                    c.set_marker(&prev, Marker::Right);
                }
                drag.index -= 1;
            }
            Shift::Forward => {
                let Some(next) = ids.get(target + 1).cloned() else {
                    return false;
                };
                if c.marker(&target_id) == Some(Marker::Right) {
                    c.remove_marker(&target_id);
                } else {
                    c.set_marker(&next, Marker::Left);
                }
                drag.index += 1;
            }
        }
        trace!("Shift {:?}: {} now at {}", shift, drag.gesture.item, drag.index);
        true
    }

    fn update_autoscroll(&self, c: &Containers, drag: &mut ActiveDrag, now: Instant) {
        let w = self.config.item_width;
        let dir = strip_helpers::edge_scroll(
            drag.left() - c.geometry.strip_left,
            w,
            c.geometry.client_width,
            self.config.autoscroll_edge,
            c.scroll_x(),
            c.max_scroll(w),
        );
        match dir {
            Some(dir) => drag.autoscroll.schedule(dir, now),
            None => drag.autoscroll.cancel(),
        }
    }
}
