//! Thumbnail store collaborator: per-clip documents whose attachments are the
//! rendered frames.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use super::{ClipId, StoreError};

/// Per-clip metadata snapshot: which frame thumbnails exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThumbDoc {
    pub clip_id: ClipId,
    pub attachments: BTreeSet<usize>,
}

impl ThumbDoc {
    /// Snapshot that knows of no thumbnails yet
    pub fn empty(clip_id: impl Into<ClipId>) -> Self {
        Self {
            clip_id: clip_id.into(),
            attachments: BTreeSet::new(),
        }
    }

    pub fn has_frame(&self, frame: usize) -> bool {
        self.attachments.contains(&frame)
    }
}

pub trait ThumbnailStore: Send + Sync {
    /// Re-read the clip's thumbnail document from the authoritative store.
    fn get(&self, clip_id: &str) -> Result<ThumbDoc, StoreError>;

    /// URI of one rendered frame, bound into the frame widget.
    fn attachment_url(&self, clip_id: &str, frame: usize) -> String;
}

/// In-memory thumbnail store. Interior mutability lets a simulated worker
/// publish frames while the queue holds a shared reference.
#[derive(Debug)]
pub struct MemoryThumbStore {
    base_url: String,
    docs: RwLock<HashMap<ClipId, BTreeSet<usize>>>,
}

impl Default for MemoryThumbStore {
    fn default() -> Self {
        Self::new("/thumbnails")
    }
}

impl MemoryThumbStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            docs: RwLock::new(HashMap::new()),
        }
    }

    /// Record rendered frames for a clip, creating its document if needed.
    pub fn put_frames(&self, clip_id: &str, frames: impl IntoIterator<Item = usize>) {
        let mut docs = self.docs.write().unwrap_or_else(|e| e.into_inner());
        docs.entry(clip_id.to_string()).or_default().extend(frames);
    }

    pub fn remove_clip(&self, clip_id: &str) {
        self.docs.write().unwrap_or_else(|e| e.into_inner()).remove(clip_id);
    }
}

impl ThumbnailStore for MemoryThumbStore {
    fn get(&self, clip_id: &str) -> Result<ThumbDoc, StoreError> {
        let docs = self.docs.read().unwrap_or_else(|e| e.into_inner());
        docs.get(clip_id)
            .map(|frames| ThumbDoc {
                clip_id: clip_id.to_string(),
                attachments: frames.clone(),
            })
            .ok_or_else(|| StoreError::NotFound(clip_id.to_string()))
    }

    fn attachment_url(&self, clip_id: &str, frame: usize) -> String {
        format!("{}/{}/{}", self.base_url, clip_id, frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_clip_is_not_found() {
        let store = MemoryThumbStore::default();
        assert_eq!(store.get("x"), Err(StoreError::NotFound("x".into())));
    }

    #[test]
    fn test_put_frames_accumulates() {
        let store = MemoryThumbStore::default();
        store.put_frames("x", [0, 5]);
        store.put_frames("x", [9]);
        let doc = store.get("x").unwrap();
        assert!(doc.has_frame(0) && doc.has_frame(5) && doc.has_frame(9));
        assert!(!doc.has_frame(1));
        assert_eq!(store.attachment_url("x", 5), "/thumbnails/x/5");
    }
}
