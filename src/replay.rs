//! Scripted editing sessions.
//!
//! A script carries the documents of an in-memory session, the thumbnails
//! already rendered, and a list of input steps. Steps run through the editor
//! exactly as a host would deliver them; the simulated worker records every
//! `ThumbnailRequestEvent` and, with `auto_worker`, renders the frames and
//! answers with `ThumbnailFinishedEvent`.

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::EditorConfig;
use crate::core::bus_events::{ThumbnailFinishedEvent, ThumbnailRequestEvent};
use crate::core::event_bus::EventBus;
use crate::core::thumb_queue::QueueStats;
use crate::editor::Editor;
use crate::entities::{BucketEntry, ClipId, Document, DocumentStore, MemorySession, MemoryThumbStore, SliceId};
use crate::widgets::slice::FramePoint;
use crate::widgets::strip::{Point2, StripGeometry};

/// Upper bound on worker round trips after one step
const MAX_WORKER_ROUNDS: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    /// Sequence document to open
    pub sequence: String,
    #[serde(default)]
    pub documents: Vec<Document>,
    /// Frames already rendered, per clip
    #[serde(default)]
    pub thumbnails: IndexMap<ClipId, Vec<usize>>,
    /// Layout override for this session
    #[serde(default)]
    pub geometry: Option<StripGeometry>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Failed to parse script {}", path.display()))
    }
}

/// One input delivered to the editor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Down { id: SliceId, x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up { x: f32, y: f32 },
    /// Advance the clock and fire timers
    Wait { ms: u64 },
    Select { id: Option<SliceId> },
    Wheel {
        id: SliceId,
        point: FramePoint,
        delta_y: f32,
        #[serde(default)]
        shift: bool,
    },
    /// Worker renders frames without announcing them
    Render { clip: ClipId, frames: Vec<usize> },
    /// Worker completion notice
    Finish { clip: ClipId },
    /// Change made by another client
    Remote { doc: Document },
    Resize { geometry: StripGeometry },
}

/// Thumbnails bound to a slice's in and out cells
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SliceThumbs {
    #[serde(rename = "in")]
    pub in_url: Option<String>,
    #[serde(rename = "out")]
    pub out_url: Option<String>,
}

/// State after the replay, as committed to the session
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub sequence: Vec<SliceId>,
    pub bucket: Vec<BucketEntry>,
    pub selected: Option<SliceId>,
    pub commits: usize,
    pub thumbnails: BTreeMap<SliceId, SliceThumbs>,
    /// Batches sent to the worker, in order
    pub requests: Vec<(ClipId, Vec<usize>)>,
    pub stats: QueueStats,
}

pub struct Replay {
    editor: Editor<MemorySession>,
    store: Arc<MemoryThumbStore>,
    /// Requests not yet answered by the simulated worker
    inbox: Arc<Mutex<Vec<ThumbnailRequestEvent>>>,
    sent: Vec<(ClipId, Vec<usize>)>,
    sequence_id: String,
    start: Instant,
    elapsed: Duration,
    auto_worker: bool,
}

impl Replay {
    pub fn new(config: EditorConfig, script: &Script, auto_worker: bool) -> Result<Self> {
        let store = Arc::new(MemoryThumbStore::default());
        for (clip, frames) in &script.thumbnails {
            store.put_frames(clip, frames.iter().copied());
        }

        // Simulated time starts no later than the editor's own clock
        let start = Instant::now();
        let bus = EventBus::new();
        let inbox = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&inbox);
        bus.subscribe::<ThumbnailRequestEvent, _>(move |e| {
            sink.lock().unwrap_or_else(|p| p.into_inner()).push(e.clone());
        });

        let session = MemorySession::with_docs(script.documents.iter().cloned());
        let mut editor = Editor::new(config, session, store.clone(), bus);
        if let Some(geometry) = script.geometry {
            editor.set_geometry(geometry);
        }
        editor
            .open(&script.sequence)
            .with_context(|| format!("Failed to open sequence {}", script.sequence))?;

        let mut replay = Self {
            editor,
            store,
            inbox,
            sent: Vec::new(),
            sequence_id: script.sequence.clone(),
            start,
            elapsed: Duration::ZERO,
            auto_worker,
        };
        replay.settle();
        Ok(replay)
    }

    pub fn editor(&self) -> &Editor<MemorySession> {
        &self.editor
    }

    fn now(&self) -> Instant {
        self.start + self.elapsed
    }

    pub fn run(&mut self, steps: &[Step]) -> Result<()> {
        for (i, step) in steps.iter().enumerate() {
            debug!("Step {}: {:?}", i, step);
            self.apply(step).with_context(|| format!("Step {} ({:?}) failed", i, step))?;
            self.settle();
        }
        Ok(())
    }

    fn apply(&mut self, step: &Step) -> Result<()> {
        match step {
            Step::Down { id, x, y } => {
                if !self.editor.pointer_down(Point2::new(*x, *y), id) {
                    warn!("Press on {} not taken", id);
                }
            }
            Step::Move { x, y } => {
                let now = self.now();
                let outcome = self.editor.pointer_move(Point2::new(*x, *y), now);
                debug!("Move -> {:?}", outcome);
            }
            Step::Up { x, y } => {
                let outcome = self.editor.pointer_up(Point2::new(*x, *y));
                debug!("Up -> {:?}", outcome);
            }
            Step::Wait { ms } => {
                self.elapsed += Duration::from_millis(*ms);
                let now = self.now();
                self.editor.tick(now);
            }
            Step::Select { id } => self.editor.select(id.as_deref()),
            Step::Wheel {
                id,
                point,
                delta_y,
                shift,
            } => {
                if !self.editor.wheel(id, *point, *delta_y, *shift) {
                    debug!("Wheel on {} changed nothing", id);
                }
            }
            Step::Render { clip, frames } => self.store.put_frames(clip, frames.iter().copied()),
            Step::Finish { clip } => self.editor.bus().emit(ThumbnailFinishedEvent(clip.clone())),
            Step::Remote { doc } => {
                if doc.id() == self.sequence_id && !matches!(doc, Document::Sequence(_)) {
                    bail!("Remote change replaces sequence {} with another document type", doc.id());
                }
                self.editor.session_mut().apply_remote(doc.clone());
            }
            Step::Resize { geometry } => self.editor.set_geometry(*geometry),
        }
        Ok(())
    }

    /// Deliver pending notifications; with the auto worker, answer batches
    /// until the queue stops asking.
    fn settle(&mut self) {
        let now = self.now();
        self.editor.pump(now);
        for _ in 0..MAX_WORKER_ROUNDS {
            let batch = self.take_requests();
            if batch.is_empty() || !self.auto_worker {
                return;
            }
            for request in batch {
                self.store.put_frames(&request.clip_id, request.frames.iter().copied());
                self.editor.bus().emit(ThumbnailFinishedEvent(request.clip_id));
            }
            self.editor.pump(now);
        }
        warn!("Worker still busy after {} rounds", MAX_WORKER_ROUNDS);
    }

    fn take_requests(&mut self) -> Vec<ThumbnailRequestEvent> {
        let batch = std::mem::take(&mut *self.inbox.lock().unwrap_or_else(|p| p.into_inner()));
        self.sent
            .extend(batch.iter().map(|r| (r.clip_id.clone(), r.frames.clone())));
        batch
    }

    pub fn report(&mut self) -> Result<Report> {
        self.take_requests();
        let session = self.editor.session();
        let doc = session
            .get_sequence(&self.sequence_id)
            .with_context(|| format!("Sequence {} missing from session", self.sequence_id))?;

        let mut thumbnails = BTreeMap::new();
        for id in doc.src.iter().chain(doc.doodle.iter().map(|e| &e.id)) {
            if let Some(widget) = self.editor.slice(id) {
                let (start, end) = widget.thumbnails();
                thumbnails.insert(
                    id.clone(),
                    SliceThumbs {
                        in_url: start.map(|t| t.url),
                        out_url: end.map(|t| t.url),
                    },
                );
            }
        }

        Ok(Report {
            commits: session.commit_count(),
            sequence: doc.src,
            bucket: doc.doodle,
            selected: doc.selected,
            thumbnails,
            requests: self.sent.clone(),
            stats: self.editor.queue().stats(),
        })
    }
}

/// Load a script, replay it and report the committed state.
pub fn run_script(path: &Path, config: EditorConfig, auto_worker: bool) -> Result<Report> {
    let script = Script::load(path)?;
    info!(
        "Replaying {} ({} documents, {} steps)",
        path.display(),
        script.documents.len(),
        script.steps.len()
    );
    let mut replay = Replay::new(config, &script, auto_worker)?;
    replay.run(&script.steps)?;
    replay.report()
}
