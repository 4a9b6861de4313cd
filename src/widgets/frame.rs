//! Frame cell - one thumbnail bound to (clip, frame index).

use crate::core::thumb_queue::{RequesterId, Thumbnail, ThumbnailQueueHandle};
use crate::entities::ClipId;
use uuid::Uuid;

/// Thumbnail cell showing one frame of a clip.
///
/// Changing the index asks the queue for the new frame; the cell shows a
/// placeholder until the queue binds a thumbnail for that exact frame.
#[derive(Debug)]
pub struct FrameWidget {
    id: RequesterId,
    clip_id: ClipId,
    index: Option<usize>,
    queue: ThumbnailQueueHandle,
}

impl FrameWidget {
    pub fn new(clip_id: impl Into<ClipId>, queue: ThumbnailQueueHandle) -> Self {
        Self {
            id: Uuid::new_v4(),
            clip_id: clip_id.into(),
            index: None,
            queue,
        }
    }

    pub fn id(&self) -> RequesterId {
        self.id
    }

    pub fn clip_id(&self) -> &str {
        &self.clip_id
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Show frame `index`. No-op (returns false) if it is already shown.
    pub fn set_index(&mut self, index: usize) -> bool {
        if self.index == Some(index) {
            return false;
        }
        self.index = Some(index);
        self.queue.enqueue(self.id, &self.clip_id, index);
        true
    }

    /// One-based frame number shown on the cell
    pub fn label(&self) -> Option<String> {
        self.index.map(|i| (i + 1).to_string())
    }

    /// Bound thumbnail, if it is for the frame currently shown.
    pub fn thumbnail(&self) -> Option<Thumbnail> {
        let index = self.index?;
        self.queue
            .thumbnail_for(self.id)
            .filter(|t| t.frame == index && t.clip_id == self.clip_id)
    }
}

impl Drop for FrameWidget {
    fn drop(&mut self) {
        self.queue.forget(self.id);
    }
}
