//! Slice item - in/out frame cells bound to a slice document.

use log::trace;
use std::time::Instant;

use super::frame::FrameWidget;
use super::strip::{Containers, Point2, ReorderEngine};
use crate::core::thumb_queue::{Thumbnail, ThumbnailQueueHandle};
use crate::entities::{SliceDoc, wheel_delta};

/// Which end of the slice a wheel event trims
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FramePoint {
    In,
    Out,
}

#[derive(Debug)]
pub struct SliceWidget {
    doc: SliceDoc,
    start: FrameWidget,
    end: FrameWidget,
    queue: ThumbnailQueueHandle,
}

impl SliceWidget {
    /// Build the widget and request both thumbnails without flushing;
    /// the caller flushes (usually by unfreezing the queue).
    pub fn new(doc: SliceDoc, queue: &ThumbnailQueueHandle) -> Self {
        let mut widget = Self {
            start: FrameWidget::new(doc.src.clone(), queue.clone()),
            end: FrameWidget::new(doc.src.clone(), queue.clone()),
            doc: doc.clone(),
            queue: queue.clone(),
        };
        widget.on_change(doc, None);
        widget
    }

    pub fn id(&self) -> &str {
        &self.doc.id
    }

    pub fn doc(&self) -> &SliceDoc {
        &self.doc
    }

    pub fn start(&self) -> &FrameWidget {
        &self.start
    }

    pub fn end(&self) -> &FrameWidget {
        &self.end
    }

    /// Apply a new document revision; flushes the queue at `flush_at` if given.
    pub fn on_change(&mut self, doc: SliceDoc, flush_at: Option<Instant>) {
        self.start.set_index(doc.in_frame());
        self.end.set_index(doc.out_frame());
        self.doc = doc;
        if let Some(now) = flush_at {
            self.queue.flush(now);
        }
    }

    /// Trim one end by a wheel notch. Returns true if the document changed;
    /// the caller saves and commits it.
    pub fn wheel(
        &mut self,
        point: FramePoint,
        delta_y: f32,
        shift: bool,
        clip_frames: usize,
        now: Instant,
    ) -> bool {
        let delta = wheel_delta(delta_y, shift);
        let mut doc = self.doc.clone();
        let changed = match point {
            FramePoint::In => doc.nudge_start(delta),
            FramePoint::Out => doc.nudge_stop(delta, clip_frames),
        };
        if changed {
            trace!("Trim {} {:?} by {} -> [{}, {})", doc.id, point, delta, doc.start, doc.stop);
            self.on_change(doc, Some(now));
        }
        changed
    }

    /// Hand a pointer-down on this slice to the reorder engine.
    pub fn begin_drag(&self, engine: &mut ReorderEngine, containers: &Containers, pointer: Point2) -> bool {
        engine.begin(containers, pointer, &self.doc.id)
    }

    pub fn thumbnails(&self) -> (Option<Thumbnail>, Option<Thumbnail>) {
        (self.start.thumbnail(), self.end.thumbnail())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bus_events::ThumbnailRequestEvent;
    use crate::core::event_bus::{BusEmitter, EventBus, downcast_event};
    use crate::core::thumb_queue::{QueueConfig, ThumbnailQueue};
    use crate::entities::{BucketEntry, MemoryThumbStore};
    use crate::widgets::strip::{StripConfig, StripGeometry};
    use std::sync::Arc;

    fn queue_on(bus: &EventBus) -> ThumbnailQueueHandle {
        let store = Arc::new(MemoryThumbStore::default());
        ThumbnailQueueHandle::new(
            ThumbnailQueue::new(QueueConfig::default(), store),
            BusEmitter::from_emitter(bus.emitter()),
        )
    }

    #[test]
    fn test_change_requests_in_and_out_frames() {
        let bus = EventBus::new();
        let queue = queue_on(&bus);
        let mut slice = SliceWidget::new(SliceDoc::new("s", "clip", 3, 8), &queue);
        assert_eq!(slice.start().index(), Some(3));
        assert_eq!(slice.end().index(), Some(7));
        // Not flushed yet
        assert!(bus.poll().is_empty());

        slice.on_change(SliceDoc::new("s", "clip", 3, 8), Some(Instant::now()));
        let events = bus.poll();
        assert_eq!(events.len(), 1);
        let request = downcast_event::<ThumbnailRequestEvent>(&events[0]).unwrap();
        assert_eq!(request.frames, vec![3, 7]);
    }

    #[test]
    fn test_wheel_trims_within_bounds() {
        let bus = EventBus::new();
        let queue = queue_on(&bus);
        let mut slice = SliceWidget::new(SliceDoc::new("s", "clip", 0, 10), &queue);
        let now = Instant::now();

        // Wheel up moves the in-point back: already at 0
        assert!(!slice.wheel(FramePoint::In, 120.0, false, 20, now));
        assert!(slice.wheel(FramePoint::In, -120.0, true, 20, now));
        assert_eq!(slice.doc().start, 10 - 1);
        assert_eq!(slice.start().index(), Some(9));

        assert!(slice.wheel(FramePoint::Out, -120.0, true, 20, now));
        assert_eq!(slice.doc().stop, 20);
        assert_eq!(slice.end().index(), Some(19));
        assert!(!slice.wheel(FramePoint::Out, -120.0, false, 20, now));
    }

    #[test]
    fn test_begin_drag_delegates() {
        let queue = queue_on(&EventBus::new());
        let slice = SliceWidget::new(SliceDoc::new("s", "clip", 0, 10), &queue);
        let mut containers = Containers::new(StripGeometry::default());
        containers.reconcile(&[], &[BucketEntry::new("s", 0.0, 0.0)]);
        let mut engine = ReorderEngine::new(StripConfig::default(), BusEmitter::dummy());

        assert!(slice.begin_drag(&mut engine, &containers, Point2::new(5.0, 5.0)));
        assert_eq!(engine.dragged_item(), Some("s"));
    }
}
