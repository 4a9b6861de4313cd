//! Strip widget events.

use super::strip::{FinalOrder, Zone};
use crate::entities::SliceId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SliceDragStartedEvent(pub SliceId);

/// Dragged slice moved; `index` is its live slot while over the strip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SliceDraggedEvent {
    pub id: SliceId,
    pub zone: Zone,
    pub index: Option<usize>,
}

/// Press released below the drag threshold (a click).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SliceDragCancelledEvent {
    pub id: SliceId,
    /// Slice was brought to the top of the bucket
    pub raised: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SliceDroppedEvent {
    pub id: SliceId,
    pub order: FinalOrder,
}

/// Sequence document written and committed by the editor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceCommittedEvent {
    pub sequence_id: String,
    pub src: Vec<SliceId>,
}
