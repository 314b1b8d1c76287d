//! Snapshot history for undo and redo
//!
//! Each entry is a zstd-compressed JSON copy of the whole graph taken after a
//! committed edit. The entry at `cursor` always mirrors the live graph, so
//! undo steps the cursor back and hands out the entry it lands on.

use std::collections::VecDeque;

use crate::error::{CanvasError, Result};
use crate::types::WorkflowGraph;

const COMPRESSION_LEVEL: i32 = 3;

pub struct UndoStack {
    entries: VecDeque<Vec<u8>>,
    cursor: usize,
    capacity: usize,
}

impl UndoStack {
    /// History keeping at most `capacity` graph states (minimum 1)
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            capacity: capacity.max(1),
        }
    }

    /// Drop all history and start again from `graph`
    pub fn reset(&mut self, graph: &WorkflowGraph) -> Result<()> {
        self.entries.clear();
        self.cursor = 0;
        self.record(graph)
    }

    /// Record the state after an edit, discarding anything redoable
    pub fn record(&mut self, graph: &WorkflowGraph) -> Result<()> {
        let entry = compress(graph)?;

        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push_back(entry);

        if self.entries.len() > self.capacity {
            let excess = self.entries.len() - self.capacity;
            self.entries.drain(..excess);
        }
        self.cursor = self.entries.len() - 1;
        Ok(())
    }

    /// Step back one edit; `None` when there is nothing to undo
    pub fn undo(&mut self) -> Option<Result<WorkflowGraph>> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(self.restore(self.cursor))
    }

    /// Step forward one edit; `None` when there is nothing to redo
    pub fn redo(&mut self) -> Option<Result<WorkflowGraph>> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(self.restore(self.cursor))
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn restore(&self, index: usize) -> Result<WorkflowGraph> {
        let bytes = zstd::decode_all(&self.entries[index][..])
            .map_err(|e| CanvasError::Compression(e.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(crate::constants::history::MAX_SNAPSHOTS)
    }
}

fn compress(graph: &WorkflowGraph) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(graph)?;
    zstd::encode_all(&json[..], COMPRESSION_LEVEL).map_err(|e| CanvasError::Compression(e.to_string()))
}
