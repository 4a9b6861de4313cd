//! Documents the editor reads and writes, and the collaborator traits that
//! hold them (document session, thumbnail store).

pub mod sequence;
pub mod slice;
pub mod store;
pub mod thumbs;

pub use sequence::{BucketEntry, SequenceDoc, SequenceError};
pub use slice::{ClipDoc, SliceDoc, SliceError, wheel_delta};
pub use store::{Document, DocumentStore, MemorySession, StoreError};
pub use thumbs::{MemoryThumbStore, ThumbDoc, ThumbnailStore};

/// Document id of a slice
pub type SliceId = String;

/// Document id of a source clip
pub type ClipId = String;
