//! Strip math: slot lookup, hysteresis, zone crossing, edge scrolling.
//!
//! Pure functions over measured geometry. Callers treat `None` as "layout not
//! measured yet" and skip the current pointer event.

use super::strip::{Point2, Zone};

/// Direction of a one-slot neighbour shift
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shift {
    /// Dragged slice moves one slot towards the start
    Back,
    /// Dragged slice moves one slot towards the end
    Forward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDir {
    Left,
    Right,
}

impl ScrollDir {
    pub fn sign(self) -> f32 {
        match self {
            ScrollDir::Left => -1.0,
            ScrollDir::Right => 1.0,
        }
    }
}

/// Usable item extent: finite and positive.
pub(crate) fn measured(size: f32) -> Option<f32> {
    (size.is_finite() && size > 0.0).then_some(size)
}

/// Insertion slot for an element whose left edge sits at `scroll_x`
/// (strip content coordinates): `round(scroll_x / width)` within `[0, len]`.
pub(crate) fn slot_for(scroll_x: f32, item_width: f32, len: usize) -> Option<usize> {
    let width = measured(item_width)?;
    if !scroll_x.is_finite() {
        return None;
    }
    let slot = (scroll_x / width).round();
    Some(slot.clamp(0.0, len as f32) as usize)
}

/// Shift implied by the element's offset from its committed slot, if the
/// offset is past `fraction * width` either way.
pub(crate) fn shift_for(scroll_x: f32, index: usize, item_width: f32, fraction: f32) -> Option<Shift> {
    let width = measured(item_width)?;
    let threshold = width * fraction;
    let dx = scroll_x - index as f32 * width;
    if dx < -threshold {
        Some(Shift::Back)
    } else if dx > threshold {
        Some(Shift::Forward)
    } else {
        None
    }
}

/// Zone the dragged element belongs to after a move.
///
/// `elem_top` is the element's top edge. Entering the strip needs the element
/// to come down past `strip_top - height * (1 - f)`, leaving it needs it to
/// rise above `strip_top - height * f`, so the band between the two keeps the
/// current zone.
pub(crate) fn zone_for(current: Zone, elem_top: f32, strip_top: f32, height: f32, fraction: f32) -> Zone {
    let Some(height) = measured(height) else {
        return current;
    };
    match current {
        Zone::Bucket if elem_top > strip_top - height * (1.0 - fraction) => Zone::Strip,
        Zone::Strip if elem_top < strip_top - height * fraction => Zone::Bucket,
        _ => current,
    }
}

/// Auto-scroll direction for an element spanning `[left, left + width)` in
/// strip client coordinates, or `None` when it is clear of both edge bands or
/// the strip cannot scroll further that way.
pub(crate) fn edge_scroll(
    left: f32,
    width: f32,
    client_width: f32,
    edge: f32,
    scroll_x: f32,
    max_scroll: f32,
) -> Option<ScrollDir> {
    let width = measured(width)?;
    let client_width = measured(client_width)?;
    let margin = width * edge;
    if left < margin && scroll_x > 0.0 {
        Some(ScrollDir::Left)
    } else if left + width > client_width - margin && scroll_x < max_scroll {
        Some(ScrollDir::Right)
    } else {
        None
    }
}

/// Clamp a pointer to the viewport; unmeasured viewports leave it as is.
pub(crate) fn clamp_to_viewport(p: Point2, viewport: Point2) -> Point2 {
    let x = match measured(viewport.x) {
        Some(w) => p.x.clamp(0.0, w),
        None => p.x,
    };
    let y = match measured(viewport.y) {
        Some(h) => p.y.clamp(0.0, h),
        None => p.y,
    };
    Point2::new(x, y)
}

/// Grab offset carried over to an item of a different size.
pub(crate) fn rescale_offset(offset: f32, from: f32, to: f32) -> f32 {
    match (measured(from), measured(to)) {
        (Some(from), Some(to)) => (offset * to / from).round(),
        _ => offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: f32 = 194.0;

    #[test]
    fn test_slot_for_rounds_and_clamps() {
        assert_eq!(slot_for(0.0, W, 3), Some(0));
        assert_eq!(slot_for(96.0, W, 3), Some(0));
        assert_eq!(slot_for(98.0, W, 3), Some(1));
        assert_eq!(slot_for(-500.0, W, 3), Some(0));
        assert_eq!(slot_for(5000.0, W, 3), Some(3));
        assert_eq!(slot_for(100.0, 0.0, 3), None);
        assert_eq!(slot_for(f32::NAN, W, 3), None);
    }

    #[test]
    fn test_shift_threshold() {
        let t = W * 0.65;
        assert_eq!(shift_for(W + t - 1.0, 1, W, 0.65), None);
        assert_eq!(shift_for(W + t + 1.0, 1, W, 0.65), Some(Shift::Forward));
        assert_eq!(shift_for(W - t + 1.0, 1, W, 0.65), None);
        assert_eq!(shift_for(W - t - 1.0, 1, W, 0.65), Some(Shift::Back));
        assert_eq!(shift_for(500.0, 0, f32::NAN, 0.65), None);
    }

    #[test]
    fn test_zone_band() {
        // strip top 400, height 100: enter below 365, leave above 335
        assert_eq!(zone_for(Zone::Bucket, 350.0, 400.0, 100.0, 0.65), Zone::Bucket);
        assert_eq!(zone_for(Zone::Bucket, 366.0, 400.0, 100.0, 0.65), Zone::Strip);
        assert_eq!(zone_for(Zone::Strip, 350.0, 400.0, 100.0, 0.65), Zone::Strip);
        assert_eq!(zone_for(Zone::Strip, 334.0, 400.0, 100.0, 0.65), Zone::Bucket);
        assert_eq!(zone_for(Zone::Strip, 0.0, 400.0, 0.0, 0.65), Zone::Strip);
    }

    #[test]
    fn test_edge_scroll() {
        // Near the right edge with room to scroll
        assert_eq!(edge_scroll(800.0, W, 960.0, 0.25, 0.0, 500.0), Some(ScrollDir::Right));
        // Already fully scrolled right
        assert_eq!(edge_scroll(800.0, W, 960.0, 0.25, 500.0, 500.0), None);
        assert_eq!(edge_scroll(10.0, W, 960.0, 0.25, 100.0, 500.0), Some(ScrollDir::Left));
        assert_eq!(edge_scroll(10.0, W, 960.0, 0.25, 0.0, 500.0), None);
        assert_eq!(edge_scroll(300.0, W, 960.0, 0.25, 100.0, 500.0), None);
        assert_eq!(edge_scroll(300.0, W, 0.0, 0.25, 100.0, 500.0), None);
    }

    #[test]
    fn test_clamp_and_rescale() {
        let vp = Point2::new(100.0, 50.0);
        assert_eq!(clamp_to_viewport(Point2::new(-5.0, 80.0), vp), Point2::new(0.0, 50.0));
        assert_eq!(clamp_to_viewport(Point2::new(-5.0, 80.0), Point2::default()), Point2::new(-5.0, 80.0));
        assert_eq!(rescale_offset(50.0, 100.0, 200.0), 100.0);
        assert_eq!(rescale_offset(50.0, 0.0, 200.0), 50.0);
    }
}
