//! Core engine modules - message bus, thumbnail queue, timers
//!
//! Independent of any rendering layer.

pub mod bus_events;
pub mod event_bus;
pub mod repeat_timer;
pub mod thumb_queue;

// Re-exports for convenience
pub use bus_events::{ThumbnailFinishedEvent, ThumbnailReadyEvent, ThumbnailRequestEvent};
pub use event_bus::{BoxedEvent, BusEmitter, Event, EventBus, EventEmitter, downcast_event};
pub use repeat_timer::RepeatTimer;
pub use thumb_queue::{
    Dispatch, FetchBatch, QueueConfig, QueueStats, RequesterId, Thumbnail, ThumbnailQueue,
    ThumbnailQueueHandle,
};
