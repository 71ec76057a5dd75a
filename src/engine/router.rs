use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use super::grouper::{chunk_group, group_segments};
use super::segment::SegmentStore;

/// A shot/version row under review. Accumulates its own slice of the live
/// transcript alongside user notes and generated summaries.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewContext {
    pub id: Uuid,
    pub identifier: String,
    pub transcript: String,
    pub notes: String,
    pub summaries: Vec<String>,
}

impl ReviewContext {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            identifier: identifier.into(),
            transcript: String::new(),
            notes: String::new(),
            summaries: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusState {
    Unfocused,
    Focused(usize),
    Pinned(usize),
}

/// Selects the single active review context and gates whether live text is
/// written at all.
///
/// Routing precedence: pinned row, else focused row, else the first row, else
/// updates are dropped. The `receiving` flag is independent of the focus
/// state; pausing never discards reconciled data because resuming re-renders
/// from the canonical set.
#[derive(Debug)]
pub struct TranscriptRouter {
    contexts: Vec<ReviewContext>,
    focus: FocusState,
    last_focused: Option<usize>,
    receiving: bool,
    /// Segment key -> owning context. A key is assigned once, when first
    /// observed, and never reassigned.
    assignments: HashMap<DateTime<Utc>, usize>,
    show_speakers: bool,
    max_chunk_chars: usize,
}

impl TranscriptRouter {
    pub fn new(show_speakers: bool, max_chunk_chars: usize) -> Self {
        Self {
            contexts: Vec::new(),
            focus: FocusState::Unfocused,
            last_focused: None,
            receiving: true,
            assignments: HashMap::new(),
            show_speakers,
            max_chunk_chars,
        }
    }

    pub fn add_context(&mut self, identifier: impl Into<String>) -> usize {
        self.contexts.push(ReviewContext::new(identifier));
        self.contexts.len() - 1
    }

    pub fn contexts(&self) -> &[ReviewContext] {
        &self.contexts
    }

    pub fn context(&self, row: usize) -> Option<&ReviewContext> {
        self.contexts.get(row)
    }

    pub fn focus_state(&self) -> FocusState {
        self.focus
    }

    pub fn is_receiving(&self) -> bool {
        self.receiving
    }

    /// Focusing an editable field in a row. While pinned this does not change
    /// the routing target, but it is remembered for unpin.
    pub fn focus(&mut self, row: usize) {
        if row >= self.contexts.len() {
            return;
        }
        self.last_focused = Some(row);
        if !matches!(self.focus, FocusState::Pinned(_)) {
            self.focus = FocusState::Focused(row);
            self.receiving = true;
        }
    }

    /// Clicking outside any editable field. Pauses delivery without altering
    /// which row would next become active; ignored while pinned.
    pub fn blur(&mut self) {
        if !matches!(self.focus, FocusState::Pinned(_)) {
            self.receiving = false;
        }
    }

    /// Explicit pause action; same gating as `blur`.
    pub fn pause(&mut self) {
        self.blur();
    }

    pub fn resume(&mut self) {
        self.receiving = true;
    }

    /// Force delivery off regardless of pin state (meeting completed/errored).
    pub fn force_stop(&mut self) {
        self.receiving = false;
    }

    /// Pin a row: overrides focus until unpinned.
    pub fn pin(&mut self, row: usize) {
        if row >= self.contexts.len() {
            return;
        }
        self.focus = FocusState::Pinned(row);
        self.last_focused = Some(row);
        self.receiving = true;
    }

    /// Unpin, returning to the last focused row or unfocused.
    pub fn unpin(&mut self) {
        if matches!(self.focus, FocusState::Pinned(_)) {
            self.focus = match self.last_focused {
                Some(row) => FocusState::Focused(row),
                None => FocusState::Unfocused,
            };
        }
    }

    /// One-tap pin toggle. Not pinned: pin this row. Pinned on this row:
    /// unpin back to focused. Pinned on another row: unpin it and focus this
    /// row without pinning.
    pub fn smart_toggle(&mut self, row: usize) {
        if row >= self.contexts.len() {
            return;
        }
        match self.focus {
            FocusState::Pinned(_) => {
                self.focus = FocusState::Focused(row);
                self.last_focused = Some(row);
                self.receiving = true;
            }
            _ => self.pin(row),
        }
    }

    /// The row live text currently routes to, if any.
    pub fn active_target(&self) -> Option<usize> {
        match self.focus {
            FocusState::Pinned(row) => Some(row),
            FocusState::Focused(row) => Some(row),
            FocusState::Unfocused => {
                if self.contexts.is_empty() {
                    None
                } else {
                    Some(0)
                }
            }
        }
    }

    /// Record freshly inserted segment keys against the active context.
    /// No-ops while paused or when there is nothing to route to; keys already
    /// assigned elsewhere are left alone even if they reappear.
    pub fn record_new_keys(&mut self, keys: &[DateTime<Utc>]) {
        if !self.receiving {
            return;
        }
        let Some(target) = self.active_target() else {
            debug!("no active context; dropping {} new segment keys", keys.len());
            return;
        };
        for key in keys {
            self.assignments.entry(*key).or_insert(target);
        }
    }

    /// Rebuild the active context's transcript from the canonical set,
    /// restricted to the keys it owns. Returns the row that was re-rendered.
    pub fn render_active(&mut self, store: &SegmentStore) -> Option<usize> {
        let target = self.active_target()?;
        let transcript = self.render(target, store);
        self.contexts[target].transcript = transcript;
        Some(target)
    }

    /// Render any context's transcript from the canonical set.
    pub fn render(&self, row: usize, store: &SegmentStore) -> String {
        let owned = store
            .ordered()
            .filter(|s| self.assignments.get(&s.absolute_start_time) == Some(&row));

        let mut lines = Vec::new();
        for group in group_segments(owned, false) {
            for chunk in chunk_group(&group, self.max_chunk_chars) {
                lines.push(chunk.display_line(self.show_speakers));
            }
        }
        lines.join("\n")
    }

    /// Full reset: forget key ownership. Contexts themselves (notes,
    /// summaries) belong to the user and survive.
    pub fn reset(&mut self) {
        self.assignments.clear();
        for context in &mut self.contexts {
            context.transcript.clear();
        }
    }
}
