//! Strip widget - state and configuration.
//!
//! `Containers` is the in-memory model of the two drop targets: the ordered
//! strip (a horizontally scrolling row of fixed-width slices) and the bucket
//! (free-positioned slices, stacked in insertion order). Renderers are a view
//! of it; the reorder engine and the editor controller mutate it. After every
//! settle point `strip_ids()` must equal the committed sequence order.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::entities::{BucketEntry, SliceId};

/// Configuration for strip and bucket interaction
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StripConfig {
    /// Slot pitch of the strip (item plus border)
    pub item_width: f32,
    pub item_height: f32,
    pub bucket_item_width: f32,
    pub bucket_item_height: f32,
    /// Pointer travel (max of |dx|, |dy|) that turns a press into a drag
    pub drag_threshold: f32,
    /// Vertical crossing fraction of item height relative to the strip top
    pub zone_fraction: f32,
    /// Horizontal shift threshold as a fraction of item width
    pub hysteresis: f32,
    /// How far above the strip a dragged slice floats
    pub lift: f32,
    pub autoscroll_interval_ms: u64,
    /// Edge band (fraction of item width) that triggers auto-scroll
    pub autoscroll_edge: f32,
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            item_width: 192.0 + 2.0,
            item_height: 110.0,
            bucket_item_width: 128.0,
            bucket_item_height: 74.0,
            drag_threshold: 3.0,
            zone_fraction: 0.65,
            hysteresis: 0.65,
            lift: 10.0,
            autoscroll_interval_ms: 300,
            autoscroll_edge: 0.25,
        }
    }
}

impl StripConfig {
    /// Item size inside `zone`
    pub fn item_size(&self, zone: Zone) -> (f32, f32) {
        match zone {
            Zone::Strip => (self.item_width, self.item_height),
            Zone::Bucket => (self.bucket_item_width, self.bucket_item_height),
        }
    }
}

/// Pointer or element position in client coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl std::ops::Sub for Point2 {
    type Output = Point2;
    fn sub(self, rhs: Point2) -> Point2 {
        Point2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Strip,
    Bucket,
}

/// Displacement of a strip neighbour while a slice is dragged across it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marker {
    Left,
    Right,
}

/// Highlight of the slot the dragged slice came from / entered at
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverMarker {
    /// Gap before this item
    Over,
    /// Gap after this item (it is the last one)
    OverRight,
}

/// Measured layout. Zero or non-finite values mean "not laid out yet".
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StripGeometry {
    /// Client x of the strip's left edge
    pub strip_left: f32,
    /// Client y of the strip's top edge
    pub strip_top: f32,
    /// Visible width of the strip
    pub client_width: f32,
    /// Pointer positions are clamped to this area
    pub viewport: Point2,
}

impl Default for StripGeometry {
    fn default() -> Self {
        Self {
            strip_left: 0.0,
            strip_top: 400.0,
            client_width: 960.0,
            viewport: Point2::new(1280.0, 720.0),
        }
    }
}

/// Authoritative order read back from the containers after a gesture.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalOrder {
    pub sequence: Vec<SliceId>,
    pub bucket: Vec<BucketEntry>,
}

#[derive(Clone, Debug, Default)]
pub struct Containers {
    strip: Vec<SliceId>,
    /// Stacking order: last entry is on top
    bucket: Vec<BucketEntry>,
    markers: HashMap<SliceId, Marker>,
    over: Option<(SliceId, OverMarker)>,
    /// Neighbour that moved most recently
    animated: Option<SliceId>,
    grabbed: Option<SliceId>,
    /// Floating position of the grabbed slice
    drag_pos: Option<Point2>,
    scroll_x: f32,
    pub geometry: StripGeometry,
}

impl Containers {
    pub fn new(geometry: StripGeometry) -> Self {
        Self {
            geometry,
            ..Default::default()
        }
    }

    // ========== Membership ==========

    pub fn strip_ids(&self) -> &[SliceId] {
        &self.strip
    }

    pub fn bucket_entries(&self) -> &[BucketEntry] {
        &self.bucket
    }

    pub fn zone_of(&self, id: &str) -> Option<Zone> {
        if self.strip.iter().any(|s| s == id) {
            Some(Zone::Strip)
        } else if self.bucket.iter().any(|e| e.id == id) {
            Some(Zone::Bucket)
        } else {
            None
        }
    }

    pub fn strip_index(&self, id: &str) -> Option<usize> {
        self.strip.iter().position(|s| s == id)
    }

    fn bucket_index(&self, id: &str) -> Option<usize> {
        self.bucket.iter().position(|e| e.id == id)
    }

    pub fn bucket_entry(&self, id: &str) -> Option<&BucketEntry> {
        self.bucket.iter().find(|e| e.id == id)
    }

    /// Remove `id` from whichever container holds it.
    pub fn detach(&mut self, id: &str) -> Option<Zone> {
        if let Some(i) = self.strip_index(id) {
            self.strip.remove(i);
            return Some(Zone::Strip);
        }
        if let Some(i) = self.bucket_index(id) {
            self.bucket.remove(i);
            return Some(Zone::Bucket);
        }
        None
    }

    /// Insert into the strip before position `index` (clamped to the end).
    pub fn insert_strip(&mut self, index: usize, id: impl Into<SliceId>) {
        let index = index.min(self.strip.len());
        self.strip.insert(index, id.into());
    }

    /// Move a strip item from `from` to `to` (positions after removal).
    pub fn move_in_strip(&mut self, from: usize, to: usize) {
        if from >= self.strip.len() || from == to {
            return;
        }
        let id = self.strip.remove(from);
        self.insert_strip(to, id);
    }

    pub fn push_bucket(&mut self, entry: BucketEntry) {
        self.bucket.push(entry);
    }

    /// Put a bucket item on top of the stack. Returns true if it moved.
    pub fn raise_in_bucket(&mut self, id: &str) -> bool {
        match self.bucket_index(id) {
            Some(i) if i + 1 < self.bucket.len() => {
                let entry = self.bucket.remove(i);
                self.bucket.push(entry);
                true
            }
            _ => false,
        }
    }

    pub fn is_last_in_bucket(&self, id: &str) -> bool {
        self.bucket.last().is_some_and(|e| e.id == id)
    }

    pub fn set_bucket_pos(&mut self, id: &str, pos: Point2) {
        if let Some(entry) = self.bucket.iter_mut().find(|e| e.id == id) {
            entry.x = pos.x;
            entry.y = pos.y;
        }
    }

    /// Client position of an item's top-left corner.
    pub fn element_position(&self, id: &str, item_width: f32) -> Option<Point2> {
        if let Some(i) = self.strip_index(id) {
            let x = self.geometry.strip_left + i as f32 * item_width - self.scroll_x;
            return Some(Point2::new(x, self.geometry.strip_top));
        }
        self.bucket_entry(id).map(|e| Point2::new(e.x, e.y))
    }

    // ========== Drag decorations ==========

    pub fn marker(&self, id: &str) -> Option<Marker> {
        self.markers.get(id).copied()
    }

    pub fn markers(&self) -> &HashMap<SliceId, Marker> {
        &self.markers
    }

    pub(crate) fn set_marker(&mut self, id: &str, marker: Marker) {
        self.markers.insert(id.to_string(), marker);
        self.animated = Some(id.to_string());
    }

    pub(crate) fn remove_marker(&mut self, id: &str) {
        self.markers.remove(id);
        self.animated = Some(id.to_string());
    }

    /// Drop left/right displacement from every item.
    pub fn clear_markers(&mut self) {
        self.markers.clear();
        self.animated = None;
    }

    pub fn over(&self) -> Option<(&str, OverMarker)> {
        self.over.as_ref().map(|(id, m)| (id.as_str(), *m))
    }

    pub(crate) fn set_over(&mut self, id: &str, marker: OverMarker) {
        self.over = Some((id.to_string(), marker));
    }

    pub fn clear_over(&mut self) {
        self.over = None;
        self.animated = None;
    }

    pub fn animated(&self) -> Option<&str> {
        self.animated.as_deref()
    }

    pub fn grabbed(&self) -> Option<&str> {
        self.grabbed.as_deref()
    }

    pub(crate) fn set_grabbed(&mut self, id: Option<&str>) {
        self.grabbed = id.map(str::to_string);
        if self.grabbed.is_none() {
            self.drag_pos = None;
        }
    }

    pub fn drag_pos(&self) -> Option<Point2> {
        self.drag_pos
    }

    pub(crate) fn set_drag_pos(&mut self, pos: Point2) {
        self.drag_pos = Some(pos);
    }

    // ========== Scrolling ==========

    pub fn scroll_x(&self) -> f32 {
        self.scroll_x
    }

    pub fn max_scroll(&self, item_width: f32) -> f32 {
        let content = self.strip.len() as f32 * item_width;
        let max = content - self.geometry.client_width;
        if max.is_finite() { max.max(0.0) } else { 0.0 }
    }

    /// Set the scroll offset, clamped to the content. Returns the applied offset.
    pub fn scroll_to(&mut self, x: f32, item_width: f32) -> f32 {
        let x = if x.is_finite() { x } else { 0.0 };
        self.scroll_x = x.clamp(0.0, self.max_scroll(item_width));
        self.scroll_x
    }

    /// Scroll by `dx`, clamped. Returns the distance actually scrolled.
    pub fn scroll_by(&mut self, dx: f32, item_width: f32) -> f32 {
        let before = self.scroll_x;
        self.scroll_to(before + dx, item_width);
        self.scroll_x - before
    }

    // ========== Reconciliation ==========

    /// Bring both containers in line with a committed document.
    ///
    /// Walks `src` inserting each id before the first mismatching child (pulling
    /// it from wherever it is), then does the same for `doodle` and applies the
    /// bucket positions. Children left over are dropped. Returns dropped ids.
    /// The scroll offset is left alone; re-clamp it with `scroll_to`.
    pub fn reconcile(&mut self, src: &[SliceId], doodle: &[BucketEntry]) -> Vec<SliceId> {
        let before: Vec<SliceId> = self
            .strip
            .iter()
            .cloned()
            .chain(self.bucket.iter().map(|e| e.id.clone()))
            .collect();

        for (i, id) in src.iter().enumerate() {
            if self.strip.get(i) != Some(id) {
                self.detach(id);
                self.insert_strip(i, id.clone());
            }
        }
        self.strip.truncate(src.len());

        for (i, wanted) in doodle.iter().enumerate() {
            if self.bucket.get(i).map(|e| &e.id) != Some(&wanted.id) {
                self.detach(&wanted.id);
                let at = i.min(self.bucket.len());
                self.bucket.insert(at, wanted.clone());
            } else {
                self.bucket[i] = wanted.clone();
            }
        }
        self.bucket.truncate(doodle.len());

        let present: HashSet<&SliceId> = self
            .strip
            .iter()
            .chain(self.bucket.iter().map(|e| &e.id))
            .collect();
        let dropped: Vec<SliceId> = before.into_iter().filter(|id| !present.contains(id)).collect();

        // Decorations of vanished items
        self.markers.retain(|id, _| present.contains(id));
        if self.over.as_ref().is_some_and(|(id, _)| !present.contains(id)) {
            self.over = None;
        }
        dropped
    }

    /// Whether the visual strip order matches `src`.
    pub fn visual_matches(&self, src: &[SliceId]) -> bool {
        self.strip == src
    }

    /// Read the current order back from the containers.
    pub fn final_order(&self) -> FinalOrder {
        FinalOrder {
            sequence: self.strip.clone(),
            bucket: self.bucket.clone(),
        }
    }

    /// Ids that appear more than once across both containers.
    pub fn duplicate_ids(&self) -> Vec<SliceId> {
        let mut seen = HashSet::new();
        let mut dupes = Vec::new();
        for id in self.strip.iter().chain(self.bucket.iter().map(|e| &e.id)) {
            if !seen.insert(id) && !dupes.contains(id) {
                dupes.push(id.clone());
            }
        }
        dupes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[&str]) -> Vec<SliceId> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_reconcile_from_empty() {
        let mut c = Containers::default();
        let dropped = c.reconcile(&ids(&["a", "b"]), &[BucketEntry::new("c", 5.0, 6.0)]);
        assert!(dropped.is_empty());
        assert!(c.visual_matches(&ids(&["a", "b"])));
        assert_eq!(c.zone_of("c"), Some(Zone::Bucket));
        assert_eq!(c.element_position("c", 194.0), Some(Point2::new(5.0, 6.0)));
    }

    #[test]
    fn test_reconcile_moves_between_containers() {
        let mut c = Containers::default();
        c.reconcile(&ids(&["a", "b", "c"]), &[BucketEntry::new("d", 0.0, 0.0)]);

        let dropped = c.reconcile(
            &ids(&["d", "a"]),
            &[BucketEntry::new("c", 1.0, 2.0)],
        );
        assert_eq!(dropped, ids(&["b"]));
        assert_eq!(c.strip_ids(), ids(&["d", "a"]).as_slice());
        assert_eq!(c.bucket_entries(), &[BucketEntry::new("c", 1.0, 2.0)]);
        assert!(c.duplicate_ids().is_empty());
    }

    #[test]
    fn test_raise_in_bucket() {
        let mut c = Containers::default();
        c.reconcile(&[], &[BucketEntry::new("a", 0.0, 0.0), BucketEntry::new("b", 0.0, 0.0)]);
        assert!(c.is_last_in_bucket("b"));
        assert!(!c.raise_in_bucket("b"));
        assert!(c.raise_in_bucket("a"));
        assert!(c.is_last_in_bucket("a"));
    }

    #[test]
    fn test_scroll_clamped_to_content() {
        let mut c = Containers::new(StripGeometry {
            client_width: 400.0,
            ..Default::default()
        });
        c.reconcile(&ids(&["a", "b", "c"]), &[]);
        // 3 * 194 - 400 = 182
        assert_eq!(c.scroll_by(1000.0, 194.0), 182.0);
        assert_eq!(c.scroll_by(-50.0, 194.0), -50.0);
        assert_eq!(c.scroll_to(-10.0, 194.0), 0.0);
        assert_eq!(c.scroll_to(f32::NAN, 194.0), 0.0);
    }

    #[test]
    fn test_move_in_strip() {
        let mut c = Containers::default();
        c.reconcile(&ids(&["a", "b", "c"]), &[]);
        c.move_in_strip(0, 2);
        assert_eq!(c.strip_ids(), ids(&["b", "c", "a"]).as_slice());
        c.move_in_strip(2, 0);
        assert_eq!(c.strip_ids(), ids(&["a", "b", "c"]).as_slice());
    }
}
