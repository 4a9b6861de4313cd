//! Document session collaborator.
//!
//! The editor only needs `get_doc`, `save`, `subscribe`, `commit` and
//! `delayed_commit`, plus a way to receive change notifications for the
//! documents it subscribed to. Notifications are pulled with `take_changes()`
//! from the controller's loop instead of being pushed through callbacks.

use indexmap::IndexSet;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::{ClipDoc, SequenceDoc, SliceDoc};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Document {
    Slice(SliceDoc),
    Sequence(SequenceDoc),
    Clip(ClipDoc),
}

impl Document {
    pub fn id(&self) -> &str {
        match self {
            Document::Slice(d) => &d.id,
            Document::Sequence(d) => &d.id,
            Document::Clip(d) => &d.id,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Document::Slice(_) => "slice",
            Document::Sequence(_) => "sequence",
            Document::Clip(_) => "clip",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound(String),
    WrongType {
        id: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "Document not found: {}", id),
            StoreError::WrongType { id, expected, found } => {
                write!(f, "Document {} is a {}, expected {}", id, found, expected)
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Document session as seen by the editor.
pub trait DocumentStore: Send {
    fn get_doc(&self, id: &str) -> Result<Document, StoreError>;

    /// Stage a document; visible to `get_doc` immediately, durable after commit.
    fn save(&mut self, doc: Document);

    /// Ask for change notifications on `id`.
    fn subscribe(&mut self, id: &str);

    fn commit(&mut self);

    /// Commit at the session's convenience (coalesces rapid edits).
    fn delayed_commit(&mut self);

    /// Drain change notifications for subscribed documents.
    fn take_changes(&mut self) -> Vec<Document>;

    fn get_slice(&self, id: &str) -> Result<SliceDoc, StoreError> {
        match self.get_doc(id)? {
            Document::Slice(d) => Ok(d),
            other => Err(wrong_type(id, "slice", &other)),
        }
    }

    fn get_sequence(&self, id: &str) -> Result<SequenceDoc, StoreError> {
        match self.get_doc(id)? {
            Document::Sequence(d) => Ok(d),
            other => Err(wrong_type(id, "sequence", &other)),
        }
    }

    fn get_clip(&self, id: &str) -> Result<ClipDoc, StoreError> {
        match self.get_doc(id)? {
            Document::Clip(d) => Ok(d),
            other => Err(wrong_type(id, "clip", &other)),
        }
    }
}

fn wrong_type(id: &str, expected: &'static str, found: &Document) -> StoreError {
    StoreError::WrongType {
        id: id.to_string(),
        expected,
        found: found.kind(),
    }
}

/// In-memory session used by tests and the replay tool.
#[derive(Debug, Default)]
pub struct MemorySession {
    docs: HashMap<String, Document>,
    /// Saved but not yet committed, in save order
    dirty: IndexSet<String>,
    subscribed: HashSet<String>,
    changes: Vec<Document>,
    delayed_pending: bool,
    commits: usize,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_docs(docs: impl IntoIterator<Item = Document>) -> Self {
        let mut session = Self::new();
        for doc in docs {
            session.docs.insert(doc.id().to_string(), doc);
        }
        session
    }

    /// Apply a change made by another client; notifies if subscribed.
    pub fn apply_remote(&mut self, doc: Document) {
        let id = doc.id().to_string();
        if self.subscribed.contains(&id) {
            self.changes.push(doc.clone());
        }
        self.docs.insert(id, doc);
    }

    /// Perform a pending delayed commit.
    pub fn flush_delayed(&mut self) {
        if self.delayed_pending {
            self.commit();
        }
    }

    /// Number of commits that wrote at least one document
    pub fn commit_count(&self) -> usize {
        self.commits
    }

    pub fn has_uncommitted(&self) -> bool {
        !self.dirty.is_empty()
    }
}

impl DocumentStore for MemorySession {
    fn get_doc(&self, id: &str) -> Result<Document, StoreError> {
        self.docs
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn save(&mut self, doc: Document) {
        let id = doc.id().to_string();
        trace!("MemorySession: save {}", id);
        self.dirty.insert(id.clone());
        self.docs.insert(id, doc);
    }

    fn subscribe(&mut self, id: &str) {
        self.subscribed.insert(id.to_string());
    }

    fn commit(&mut self) {
        self.delayed_pending = false;
        if self.dirty.is_empty() {
            return;
        }
        debug!("MemorySession: commit {} doc(s)", self.dirty.len());
        self.dirty.clear();
        self.commits += 1;
    }

    fn delayed_commit(&mut self) {
        self.delayed_pending = true;
    }

    fn take_changes(&mut self) -> Vec<Document> {
        std::mem::take(&mut self.changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getters() {
        let session = MemorySession::with_docs([
            Document::Clip(ClipDoc { id: "clip".into(), frames: 100 }),
            Document::Slice(SliceDoc::new("s1", "clip", 0, 10)),
        ]);
        assert_eq!(session.get_clip("clip").unwrap().frames, 100);
        assert_eq!(session.get_slice("s1").unwrap().src, "clip");
        assert_eq!(
            session.get_slice("clip"),
            Err(StoreError::WrongType { id: "clip".into(), expected: "slice", found: "clip" })
        );
        assert_eq!(session.get_doc("nope"), Err(StoreError::NotFound("nope".into())));
    }

    #[test]
    fn test_save_then_commit() {
        let mut session = MemorySession::new();
        session.save(Document::Slice(SliceDoc::new("s1", "clip", 0, 10)));
        assert!(session.has_uncommitted());
        session.commit();
        assert!(!session.has_uncommitted());
        assert_eq!(session.commit_count(), 1);

        // Nothing staged: no commit recorded
        session.commit();
        assert_eq!(session.commit_count(), 1);
    }

    #[test]
    fn test_delayed_commit() {
        let mut session = MemorySession::new();
        session.save(Document::Slice(SliceDoc::new("s1", "clip", 0, 10)));
        session.delayed_commit();
        assert_eq!(session.commit_count(), 0);
        session.flush_delayed();
        assert_eq!(session.commit_count(), 1);
    }

    #[test]
    fn test_remote_changes_only_for_subscribed() {
        let mut session = MemorySession::new();
        session.subscribe("seq");
        session.apply_remote(Document::Sequence(SequenceDoc::new("seq")));
        session.apply_remote(Document::Sequence(SequenceDoc::new("other")));

        let changes = session.take_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].id(), "seq");
        assert!(session.take_changes().is_empty());
        assert!(session.get_doc("other").is_ok());
    }

    #[test]
    fn test_document_json_tag() {
        let doc: Document =
            serde_json::from_str(r#"{"type":"slice","id":"s","src":"c","start":1,"stop":4}"#).unwrap();
        assert_eq!(doc, Document::Slice(SliceDoc::new("s", "c", 1, 4)));
    }
}
