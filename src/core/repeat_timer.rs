//! Cancellable repeating timer driven by the caller's clock.
//!
//! Used for edge auto-scroll while dragging: scheduled when the dragged slice
//! reaches a strip edge, cancelled when it leaves the edge or the gesture ends.
//! Nothing runs in the background; the owner calls `tick(now)` from its event
//! loop and applies one step per reported fire.

use std::time::{Duration, Instant};

/// Repeating timer carrying a payload (e.g. scroll direction).
#[derive(Debug, Clone)]
pub struct RepeatTimer<T: Copy + PartialEq> {
    interval: Duration,
    /// Active payload and the instant of the next fire
    pending: Option<(T, Instant)>,
}

impl<T: Copy + PartialEq> RepeatTimer<T> {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            // Zero interval would fire unboundedly per tick
            interval: Duration::from_millis(interval_ms.max(1)),
            pending: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start repeating with `payload`, first fire one interval after `now`.
    ///
    /// Re-scheduling with the same payload keeps the running phase, so a
    /// stream of pointer moves inside the edge zone does not postpone fires.
    pub fn schedule(&mut self, payload: T, now: Instant) {
        match self.pending {
            Some((current, _)) if current == payload => {}
            _ => {
                self.pending = Some((payload, now + self.interval));
                log::trace!("RepeatTimer: scheduled every {}ms", self.interval.as_millis());
            }
        }
    }

    pub fn cancel(&mut self) {
        if self.pending.take().is_some() {
            log::trace!("RepeatTimer: cancelled");
        }
    }

    /// Number of fires due at `now` (None if inactive or not yet due).
    ///
    /// The count saturates at `u32::MAX` after very long gaps; the phase is
    /// kept either way.
    pub fn tick(&mut self, now: Instant) -> Option<(T, u32)> {
        let (payload, next) = self.pending?;
        if now < next {
            return None;
        }
        let elapsed = now.duration_since(next).as_nanos();
        let period = self.interval.as_nanos();
        let fires = u32::try_from(elapsed / period).unwrap_or(u32::MAX).saturating_add(1);
        let into_period = Duration::from_nanos(u64::try_from(elapsed % period).unwrap_or(u64::MAX));
        self.pending = Some((payload, now + self.interval.saturating_sub(into_period)));
        Some((payload, fires))
    }

    pub fn is_active(&self) -> bool {
        self.pending.is_some()
    }

    pub fn payload(&self) -> Option<T> {
        self.pending.map(|(p, _)| p)
    }
}
