//! Events exchanged with the thumbnail worker over the bus.

use uuid::Uuid;

use crate::entities::ClipId;

/// Outbound: ask the worker to render these frames of a clip ("thumbnail").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThumbnailRequestEvent {
    pub clip_id: ClipId,
    pub frames: Vec<usize>,
}

/// Inbound: the worker finished a batch for this clip ("thumbnail_finished").
///
/// Completion may be partial; frames still missing are requested again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThumbnailFinishedEvent(pub ClipId);

/// A requester's thumbnail binding changed and can be redrawn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThumbnailReadyEvent {
    pub requester: Uuid,
    pub clip_id: ClipId,
    pub frame: usize,
}
