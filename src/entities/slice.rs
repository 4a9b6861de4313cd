//! Slice and clip documents.
//!
//! A slice is the half-open frame range `[start, stop)` of a source clip. The
//! in-point thumbnail shows `start`, the out-point thumbnail shows `stop - 1`.

use serde::{Deserialize, Serialize};

use super::{ClipId, SliceId};

/// Source clip metadata needed for trimming bounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipDoc {
    pub id: ClipId,
    /// Total frame count of the clip
    pub frames: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceDoc {
    pub id: SliceId,
    /// Source clip id
    pub src: ClipId,
    pub start: usize,
    pub stop: usize,
}

/// Slice range violations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceError {
    EmptyRange { start: usize, stop: usize },
    PastClipEnd { stop: usize, frames: usize },
}

impl std::fmt::Display for SliceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SliceError::EmptyRange { start, stop } => {
                write!(f, "Empty slice range: start {} >= stop {}", start, stop)
            }
            SliceError::PastClipEnd { stop, frames } => {
                write!(f, "Slice stop {} past clip end ({} frames)", stop, frames)
            }
        }
    }
}

impl std::error::Error for SliceError {}

impl SliceDoc {
    pub fn new(id: impl Into<SliceId>, src: impl Into<ClipId>, start: usize, stop: usize) -> Self {
        Self {
            id: id.into(),
            src: src.into(),
            start,
            stop,
        }
    }

    /// Check `0 <= start < stop <= frames`.
    pub fn validate(&self, frames: usize) -> Result<(), SliceError> {
        if self.start >= self.stop {
            return Err(SliceError::EmptyRange { start: self.start, stop: self.stop });
        }
        if self.stop > frames {
            return Err(SliceError::PastClipEnd { stop: self.stop, frames });
        }
        Ok(())
    }

    /// Frame shown by the in-point widget
    pub fn in_frame(&self) -> usize {
        self.start
    }

    /// Frame shown by the out-point widget
    pub fn out_frame(&self) -> usize {
        self.stop.saturating_sub(1)
    }

    /// Move the in-point by `delta`, clamped to `[0, stop - 1]`.
    /// Returns true if the slice changed.
    pub fn nudge_start(&mut self, delta: i64) -> bool {
        let max = self.stop.saturating_sub(1) as i64;
        let proposed = (self.start as i64 + delta).clamp(0, max.max(0)) as usize;
        if proposed == self.start {
            return false;
        }
        self.start = proposed;
        true
    }

    /// Move the out-point by `delta`, clamped to `[start + 1, frames]`.
    /// Returns true if the slice changed.
    pub fn nudge_stop(&mut self, delta: i64, frames: usize) -> bool {
        let min = self.start as i64 + 1;
        let max = (frames as i64).max(min);
        let proposed = (self.stop as i64 + delta).clamp(min, max) as usize;
        if proposed == self.stop {
            return false;
        }
        self.stop = proposed;
        true
    }
}

/// Frame step for one wheel notch: scrolling up moves back in time.
/// Shift steps ten frames at a time.
pub fn wheel_delta(delta_y: f32, shift: bool) -> i64 {
    if delta_y == 0.0 || !delta_y.is_finite() {
        return 0;
    }
    let scale = if shift { -10 } else { -1 };
    scale * delta_y.signum() as i64
}
