//! Sequence document: ordered timeline plus bucket ("doodle") with free positions.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::SliceId;

/// Slice parked in the bucket at a free position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketEntry {
    pub id: SliceId,
    pub x: f32,
    pub y: f32,
}

impl BucketEntry {
    pub fn new(id: impl Into<SliceId>, x: f32, y: f32) -> Self {
        Self { id: id.into(), x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SequenceDoc {
    pub id: String,
    /// Authoritative timeline order
    #[serde(default)]
    pub src: Vec<SliceId>,
    /// Bucket contents; membership matters, order is only stacking
    #[serde(default)]
    pub doodle: Vec<BucketEntry>,
    #[serde(default)]
    pub selected: Option<SliceId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    DuplicateId(SliceId),
}

impl std::fmt::Display for SequenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SequenceError::DuplicateId(id) => {
                write!(f, "Slice {} appears more than once in sequence/bucket", id)
            }
        }
    }
}

impl std::error::Error for SequenceError {}

impl SequenceDoc {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Every slice id in `src` and `doodle` must be distinct.
    pub fn check_distinct(&self) -> Result<(), SequenceError> {
        let mut seen = HashSet::new();
        let ids = self.src.iter().chain(self.doodle.iter().map(|e| &e.id));
        for id in ids {
            if !seen.insert(id) {
                return Err(SequenceError::DuplicateId(id.clone()));
            }
        }
        Ok(())
    }

    /// Copy with repeated ids removed (first occurrence wins, sequence before bucket).
    pub fn deduplicated(&self) -> SequenceDoc {
        let mut seen = HashSet::new();
        let src = self.src.iter().filter(|id| seen.insert((*id).clone())).cloned().collect();
        let doodle = self
            .doodle
            .iter()
            .filter(|e| seen.insert(e.id.clone()))
            .cloned()
            .collect();
        SequenceDoc {
            id: self.id.clone(),
            src,
            doodle,
            selected: self.selected.clone(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.src.iter().any(|s| s == id) || self.doodle.iter().any(|e| e.id == id)
    }
}
