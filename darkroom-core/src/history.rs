//! Bounded undo/redo history over serialized document snapshots.
//!
//! ```text
//!  baseline  entries[0]  entries[1]  entries[2]
//!     S0 ──────► S1 ───────► S2 ───────► S3
//!                             ▲
//!                          cursor = 2 (current state is S2)
//! ```
//!
//! The cursor counts applied entries. Pushing truncates everything right of
//! the cursor. When the ring is full the oldest entry is folded into the
//! baseline, so undo can always reach the state the oldest kept entry was
//! applied on.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{EditorError, EditorResult};
use crate::layers::{LayerManager, LayerStack};

/// Default bound on history entries.
pub const DEFAULT_MAX_HISTORY_STEPS: usize = 50;

/// Everything an undo step restores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// The full layer stack.
    pub stack: LayerStack,
}

impl DocumentSnapshot {
    /// Capture the current document.
    #[must_use]
    pub fn capture(layers: &LayerManager, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            stack: layers.snapshot(),
        }
    }

    fn encode(&self) -> EditorResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    fn decode(bytes: &[u8]) -> EditorResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// One immutable undo step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    label: String,
    snapshot: Vec<u8>,
}

impl HistoryEntry {
    /// Human-readable label, e.g. "Draw".
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Serialized snapshot bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.snapshot
    }
}

/// Linear undo/redo stack with a cursor.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    baseline: Vec<u8>,
    cursor: usize,
    max_steps: usize,
}

impl History {
    /// Create a history whose undo floor is `initial`.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be serialized.
    pub fn new(max_steps: usize, initial: &DocumentSnapshot) -> EditorResult<Self> {
        let max_steps = max_steps.max(1);
        Ok(Self {
            entries: VecDeque::with_capacity(max_steps),
            baseline: initial.encode()?,
            cursor: 0,
            max_steps,
        })
    }

    /// Drop every entry and make `snapshot` the new undo floor.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be serialized.
    pub fn reset(&mut self, snapshot: &DocumentSnapshot) -> EditorResult<()> {
        self.baseline = snapshot.encode()?;
        self.entries.clear();
        self.cursor = 0;
        Ok(())
    }

    /// Record `snapshot` as the state after a committed mutation.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be serialized; the history is
    /// unchanged in that case.
    pub fn push(
        &mut self,
        label: impl Into<String>,
        snapshot: &DocumentSnapshot,
    ) -> EditorResult<()> {
        let entry = HistoryEntry {
            label: label.into(),
            snapshot: snapshot.encode()?,
        };
        self.entries.truncate(self.cursor);
        tracing::debug!("History push \"{}\" at {}", entry.label, self.cursor);
        self.entries.push_back(entry);
        self.cursor += 1;

        while self.entries.len() > self.max_steps {
            if let Some(evicted) = self.entries.pop_front() {
                self.baseline = evicted.snapshot;
                self.cursor -= 1;
            }
        }
        Ok(())
    }

    fn bytes_at(&self, cursor: usize) -> &[u8] {
        match cursor {
            0 => &self.baseline,
            n => &self.entries[n - 1].snapshot,
        }
    }

    /// Step back one entry and return the state to restore.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NothingToUndo`] at the bottom of the stack.
    pub fn undo(&mut self) -> EditorResult<DocumentSnapshot> {
        if self.cursor == 0 {
            return Err(EditorError::NothingToUndo);
        }
        let snapshot = DocumentSnapshot::decode(self.bytes_at(self.cursor - 1))?;
        self.cursor -= 1;
        Ok(snapshot)
    }

    /// Step forward one entry and return the state to restore.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NothingToRedo`] at the top of the stack.
    pub fn redo(&mut self) -> EditorResult<DocumentSnapshot> {
        if self.cursor >= self.entries.len() {
            return Err(EditorError::NothingToRedo);
        }
        let snapshot = DocumentSnapshot::decode(self.bytes_at(self.cursor + 1))?;
        self.cursor += 1;
        Ok(snapshot)
    }

    /// The state at the cursor.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored bytes cannot be decoded.
    pub fn current(&self) -> EditorResult<DocumentSnapshot> {
        DocumentSnapshot::decode(self.bytes_at(self.cursor))
    }

    /// Raw bytes of the state at the cursor.
    #[must_use]
    pub fn current_bytes(&self) -> &[u8] {
        self.bytes_at(self.cursor)
    }

    /// Whether [`History::undo`] would succeed.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Whether [`History::redo`] would succeed.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// Label of the entry undo would revert.
    #[must_use]
    pub fn undo_label(&self) -> Option<&str> {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map(HistoryEntry::label)
    }

    /// Label of the entry redo would reapply.
    #[must_use]
    pub fn redo_label(&self) -> Option<&str> {
        self.entries.get(self.cursor).map(HistoryEntry::label)
    }

    /// Labels of every entry, oldest first.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(HistoryEntry::label)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of applied entries.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Entry bound.
    #[must_use]
    pub const fn max_steps(&self) -> usize {
        self.max_steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{LayerKind, LayerProps};

    fn snapshot_with(count: usize) -> DocumentSnapshot {
        let mut layers = LayerManager::new();
        for i in 0..count {
            layers.add_layer(LayerKind::drawing(), LayerProps::named(format!("L{i}")));
        }
        DocumentSnapshot::capture(&layers, 100, 100)
    }

    #[test]
    fn test_undo_at_bottom_reports_nothing() {
        let mut history = History::new(10, &snapshot_with(0)).expect("history");
        assert!(!history.can_undo());
        assert!(matches!(history.undo(), Err(EditorError::NothingToUndo)));
        assert!(matches!(history.redo(), Err(EditorError::NothingToRedo)));
    }

    #[test]
    fn test_undo_restores_previous_state() {
        let s0 = snapshot_with(0);
        let s1 = snapshot_with(1);
        let mut history = History::new(10, &s0).expect("history");
        history.push("Add", &s1).expect("push");

        assert_eq!(history.undo().expect("undo"), s0);
        assert_eq!(history.redo().expect("redo"), s1);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_push_truncates_redo_tail() {
        let mut history = History::new(10, &snapshot_with(0)).expect("history");
        history.push("a", &snapshot_with(1)).expect("push");
        history.push("b", &snapshot_with(2)).expect("push");
        history.undo().expect("undo");
        history.push("c", &snapshot_with(3)).expect("push");

        assert_eq!(history.labels().collect::<Vec<_>>(), vec!["a", "c"]);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_eviction_folds_into_baseline() {
        let snapshots: Vec<_> = (0..6).map(snapshot_with).collect();
        let mut history = History::new(3, &snapshots[0]).expect("history");
        for (i, s) in snapshots.iter().enumerate().skip(1) {
            history.push(format!("step {i}"), s).expect("push");
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), 3);
        assert_eq!(history.undo_label(), Some("step 5"));

        let mut last = None;
        while history.can_undo() {
            last = Some(history.undo().expect("undo"));
        }
        // Floor is the state step 3 was applied on.
        assert_eq!(last, Some(snapshots[2].clone()));
    }

    #[test]
    fn test_labels_follow_cursor() {
        let mut history = History::new(5, &snapshot_with(0)).expect("history");
        history.push("Draw", &snapshot_with(1)).expect("push");
        assert_eq!(history.undo_label(), Some("Draw"));
        assert_eq!(history.redo_label(), None);
        history.undo().expect("undo");
        assert_eq!(history.redo_label(), Some("Draw"));
    }
}
