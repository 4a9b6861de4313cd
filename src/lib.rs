//! sliceline - slice sequence editor core
//!
//! Drag-and-drop reordering between a horizontal strip and a free-form
//! bucket, plus a bounded thumbnail request queue, driven by a headless
//! editor controller.

// Core plumbing (events, timers, thumbnail queue)
pub mod core;

// App modules
pub mod cli;
pub mod config;
pub mod editor;
pub mod entities;
pub mod paths;
pub mod replay;
pub mod widgets;

pub use crate::core::event_bus::{BoxedEvent, BusEmitter, EventBus, EventEmitter, downcast_event};
pub use crate::core::thumb_queue::{ThumbnailQueue, ThumbnailQueueHandle};
pub use editor::{ConsistencyError, Editor};
pub use entities::{Document, DocumentStore, SequenceDoc, SliceDoc};
pub use widgets::strip::{Containers, ReorderEngine, ReorderOutcome};
