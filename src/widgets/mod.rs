//! Editor widgets - frame cells, slice items and the reorderable strip
//!
//! Widgets share the thumbnail queue handle and report through the EventBus

pub mod frame;
pub mod slice;
pub mod strip;

pub use frame::FrameWidget;
pub use slice::{FramePoint, SliceWidget};
