//! Strip widget - ordered row of slices plus the free-form bucket
//!
//! Drag and drop between and within both containers

mod reorder;
mod strip;
mod strip_events;
mod strip_helpers;

pub use reorder::{ActiveDrag, DragPhase, Gesture, ReorderEngine, ReorderOutcome};
pub use strip::{
    Containers, FinalOrder, Marker, OverMarker, Point2, StripConfig, StripGeometry, Zone,
};
pub use strip_events::{
    SequenceCommittedEvent, SliceDragCancelledEvent, SliceDragStartedEvent, SliceDraggedEvent,
    SliceDroppedEvent,
};
pub use strip_helpers::ScrollDir;
