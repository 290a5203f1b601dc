//! Interactive session: one document, one active step, tracked positions.
//!
//! The session owns the user-editable inputs and recomputes the derived values
//! (post-edit document and every tracked position's `MappingResult`) after each
//! mutation, synchronously. Registered observers then receive the fresh
//! `SessionView`; the display surface is one such observer.
//!
//! Clamping lives here, never in the mapper:
//! - every numeric input is clamped to `[0, document length]`;
//! - a delete's `to` is kept within `[from, length]`;
//! - document and insert text are uppercased (when configured) and truncated
//!   to their configured maximum lengths.
//!
//! The primary tracked position always exists. Additional positions can be
//! added and removed and are mapped with the same step and bias.

use core_config::SessionConfig;
use core_step::{Bias, MappingResult, Position, Step, map_with_bias};
use tracing::{debug, error, trace};

pub mod narrative;
pub use narrative::{Narrative, NarrativeKind, narrate};

/// Identifier of the primary tracked position.
pub const PRIMARY_ID: u32 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedPosition {
    pub id: u32,
    pub label: String,
    pub pos: Position,
}

/// A tracked position together with where the active step sends it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedView {
    pub id: u32,
    pub label: String,
    pub result: MappingResult,
}

/// Snapshot published after every recomputation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub doc_before: String,
    pub doc_after: String,
    pub step: Step,
    pub bias: Bias,
    pub primary: TrackedView,
    pub extra: Vec<TrackedView>,
}

impl SessionView {
    pub fn tracked(&self) -> impl Iterator<Item = &TrackedView> {
        std::iter::once(&self.primary).chain(self.extra.iter())
    }
}

/// Receives every view the session publishes. Observers must not block.
pub trait SessionObserver: Send + Sync {
    fn on_view(&self, view: &SessionView);
}

#[derive(Debug, Clone)]
struct Limits {
    max_document_len: usize,
    max_insert_len: usize,
    uppercase: bool,
    default_insert_text: String,
}

impl Limits {
    fn shape(&self, text: &str, max: usize) -> String {
        let text = if self.uppercase {
            text.to_uppercase()
        } else {
            text.to_string()
        };
        text.chars().take(max).collect()
    }
}

pub struct Session {
    document: String,
    step: Step,
    bias: Bias,
    primary: TrackedPosition,
    extra: Vec<TrackedPosition>,
    next_id: u32,
    limits: Limits,
    view: SessionView,
    observers: Vec<Box<dyn SessionObserver>>,
    batching: bool,
}

impl Session {
    /// Seed the session from config: the document, the tracked position and an
    /// insert of the default text at that same position.
    pub fn new(cfg: &SessionConfig) -> Self {
        let limits = Limits {
            max_document_len: cfg.max_document_len.max(1),
            max_insert_len: cfg.max_insert_len,
            uppercase: cfg.uppercase,
            default_insert_text: String::new(),
        };
        let default_insert_text = limits.shape(&cfg.insert_text, limits.max_insert_len);
        let limits = Limits {
            default_insert_text,
            ..limits
        };
        let document = limits.shape(&cfg.document, limits.max_document_len);
        let pos = cfg.tracked.min(document.chars().count());
        let step = Step::insert(pos, limits.default_insert_text.clone());
        let primary = TrackedPosition {
            id: PRIMARY_ID,
            label: "cursor".to_string(),
            pos,
        };
        let view = derive_view(&document, &step, Bias::Right, &primary, &[]);
        Self {
            document,
            step,
            bias: Bias::Right,
            primary,
            extra: Vec::new(),
            next_id: PRIMARY_ID + 1,
            limits,
            view,
            observers: Vec::new(),
            batching: false,
        }
    }

    pub fn add_observer(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn doc_len(&self) -> usize {
        self.document.chars().count()
    }

    pub fn step(&self) -> &Step {
        &self.step
    }

    pub fn bias(&self) -> Bias {
        self.bias
    }

    pub fn tracked(&self) -> Position {
        self.primary.pos
    }

    pub fn extra_tracked(&self) -> &[TrackedPosition] {
        &self.extra
    }

    /// Latest derived snapshot.
    pub fn view(&self) -> &SessionView {
        &self.view
    }

    pub fn narrative(&self) -> Narrative {
        narrate(&self.view.step, self.view.bias, &self.view.primary.result)
    }

    pub fn set_document(&mut self, text: &str) {
        self.document = self.limits.shape(text, self.limits.max_document_len);
        let len = self.doc_len();
        self.primary.pos = self.primary.pos.min(len);
        for t in &mut self.extra {
            t.pos = t.pos.min(len);
        }
        self.step = match &self.step {
            Step::Insert { from, text } => Step::insert((*from).min(len), text.clone()),
            Step::Delete { from, to } => {
                let from = (*from).min(len);
                Step::delete(from, (*to).clamp(from, len))
            }
        };
        debug!(target: "session", doc_len = len, "document_set");
        self.publish();
    }

    pub fn set_tracked(&mut self, pos: Position) {
        self.primary.pos = pos.min(self.doc_len());
        self.publish();
    }

    /// Track another position; returns its id.
    pub fn add_tracked(&mut self, label: &str, pos: Position) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.extra.push(TrackedPosition {
            id,
            label: label.to_string(),
            pos: pos.min(self.doc_len()),
        });
        debug!(target: "session", id, tracked = self.extra.len() + 1, "tracked_added");
        self.publish();
        id
    }

    /// Remove a non-primary tracked position. Returns false if `id` is the
    /// primary or unknown.
    pub fn remove_tracked(&mut self, id: u32) -> bool {
        let before = self.extra.len();
        self.extra.retain(|t| t.id != id);
        if self.extra.len() == before {
            return false;
        }
        debug!(target: "session", id, "tracked_removed");
        self.publish();
        true
    }

    /// Switch to an insert at the current `from` with the default text.
    pub fn select_insert(&mut self) {
        self.step = Step::insert(self.step.from(), self.limits.default_insert_text.clone());
        self.publish();
    }

    /// Switch to a one-character delete at the current `from` (empty at the end).
    pub fn select_delete(&mut self) {
        let from = self.step.from();
        self.step = Step::delete(from, (from + 1).min(self.doc_len()));
        self.publish();
    }

    pub fn set_from(&mut self, from: Position) {
        let from = from.min(self.doc_len());
        self.step = match &self.step {
            Step::Insert { text, .. } => Step::insert(from, text.clone()),
            Step::Delete { to, .. } => Step::delete(from, from.max(*to)),
        };
        self.publish();
    }

    /// Set the end of a delete. Ignored (returns false) for inserts.
    pub fn set_to(&mut self, to: Position) -> bool {
        let Step::Delete { from, .. } = self.step else {
            return false;
        };
        self.step = Step::delete(from, to.clamp(from, self.doc_len()));
        self.publish();
        true
    }

    /// Set the inserted text. Ignored (returns false) for deletes.
    pub fn set_insert_text(&mut self, text: &str) -> bool {
        let Step::Insert { from, .. } = self.step else {
            return false;
        };
        self.step = Step::insert(from, self.limits.shape(text, self.limits.max_insert_len));
        self.publish();
        true
    }

    pub fn set_bias(&mut self, bias: Bias) {
        self.bias = bias;
        self.publish();
    }

    /// Run several setters and publish one view at the end. `view()` is
    /// stale inside `f`.
    pub fn batch(&mut self, f: impl FnOnce(&mut Self)) {
        self.batching = true;
        f(self);
        self.batching = false;
        self.publish();
    }

    fn publish(&mut self) {
        if self.batching {
            return;
        }
        self.view = derive_view(
            &self.document,
            &self.step,
            self.bias,
            &self.primary,
            &self.extra,
        );
        trace!(
            target: "session",
            step = %self.view.step,
            old_pos = self.view.primary.result.old_pos,
            new_pos = self.view.primary.result.new_pos,
            deleted = self.view.primary.result.deleted,
            observers = self.observers.len(),
            "view_published"
        );
        for obs in &self.observers {
            obs.on_view(&self.view);
        }
    }
}

fn derive_view(
    document: &str,
    step: &Step,
    bias: Bias,
    primary: &TrackedPosition,
    extra: &[TrackedPosition],
) -> SessionView {
    let doc_after = match step.apply(document) {
        Ok(doc) => doc,
        Err(e) => {
            // Unreachable while the setters clamp; keep the old text visible.
            error!(target: "session", error = %e, "step_apply_failed");
            document.to_string()
        }
    };
    let view_of = |t: &TrackedPosition| TrackedView {
        id: t.id,
        label: t.label.clone(),
        result: map_with_bias(t.pos, step, bias),
    };
    SessionView {
        doc_before: document.to_string(),
        doc_after,
        step: step.clone(),
        bias,
        primary: view_of(primary),
        extra: extra.iter().map(view_of).collect(),
    }
}
