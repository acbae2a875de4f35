//! Edit history
//!
//! Each user edit records a zstd-compressed JSON snapshot of the whole
//! document. Stepping back or forward decodes the neighbouring snapshot.

use std::collections::VecDeque;

use crate::error::{GraphError, Result};
use crate::types::WorkflowDocument;

/// Snapshots kept when no depth is configured
pub const DEFAULT_UNDO_DEPTH: usize = 100;

const COMPRESSION_LEVEL: i32 = 3;

struct Snapshot {
    bytes: Vec<u8>,
    node_count: usize,
    edge_count: usize,
}

impl Snapshot {
    fn capture(document: &WorkflowDocument) -> Result<Self> {
        let json = serde_json::to_vec(document)?;
        let bytes = zstd::encode_all(json.as_slice(), COMPRESSION_LEVEL)
            .map_err(|e| GraphError::Compression(e.to_string()))?;
        Ok(Self {
            bytes,
            node_count: document.nodes.len(),
            edge_count: document.edges.len(),
        })
    }

    fn restore(&self) -> Result<WorkflowDocument> {
        let json = zstd::decode_all(self.bytes.as_slice())
            .map_err(|e| GraphError::Compression(e.to_string()))?;
        Ok(serde_json::from_slice(&json)?)
    }
}

/// Bounded history of document snapshots with a cursor
///
/// The entry under the cursor is the state currently shown. Recording a
/// new snapshot discards everything after the cursor.
pub struct UndoStack {
    history: VecDeque<Snapshot>,
    cursor: usize,
    depth: usize,
}

impl UndoStack {
    pub fn new(depth: usize) -> Self {
        Self {
            history: VecDeque::new(),
            cursor: 0,
            depth: depth.max(1),
        }
    }

    /// Record `document` as the newest state
    pub fn push(&mut self, document: &WorkflowDocument) -> Result<()> {
        let snapshot = Snapshot::capture(document)?;
        if !self.history.is_empty() {
            self.history.truncate(self.cursor + 1);
        }
        self.history.push_back(snapshot);
        if self.history.len() > self.depth {
            self.history.pop_front();
        }
        self.cursor = self.history.len() - 1;
        Ok(())
    }

    /// Move the cursor back; `None` at the oldest entry
    pub fn undo(&mut self) -> Option<Result<WorkflowDocument>> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(self.restore_current())
    }

    /// Move the cursor forward; `None` at the newest entry
    pub fn redo(&mut self) -> Option<Result<WorkflowDocument>> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(self.restore_current())
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.history.len()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.cursor = 0;
    }

    /// Apply `edit` to every recorded snapshot, keeping the cursor
    pub fn rewrite(&mut self, mut edit: impl FnMut(&mut WorkflowDocument)) -> Result<()> {
        for snapshot in self.history.iter_mut() {
            let mut document = snapshot.restore()?;
            edit(&mut document);
            *snapshot = Snapshot::capture(&document)?;
        }
        Ok(())
    }

    /// Bytes held by all snapshots
    pub fn compressed_size(&self) -> usize {
        self.history.iter().map(|s| s.bytes.len()).sum()
    }

    fn restore_current(&mut self) -> Result<WorkflowDocument> {
        let snapshot = &self.history[self.cursor];
        log::debug!(
            "Restoring snapshot {} of {} ({} nodes, {} edges)",
            self.cursor + 1,
            self.history.len(),
            snapshot.node_count,
            snapshot.edge_count
        );
        snapshot.restore()
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_DEPTH)
    }
}
