//! Undo/redo over compressed graph snapshots
//!
//! Editors call [`UndoHistory::record`] with [`Engine::snapshot`] after each
//! structural edit and feed whatever [`UndoHistory::undo`] or
//! [`UndoHistory::redo`] hands back into [`Engine::restore`]. Snapshots are
//! stored as zstd-compressed JSON.
//!
//! [`Engine::snapshot`]: crate::Engine::snapshot
//! [`Engine::restore`]: crate::Engine::restore

use std::collections::VecDeque;

use crate::error::{EngineError, Result};
use crate::types::GraphDocument;

const COMPRESSION_LEVEL: i32 = 3;

/// Default number of snapshots kept
pub const DEFAULT_HISTORY_DEPTH: usize = 100;

/// Bounded undo/redo history of graph documents
pub struct UndoHistory {
    /// Older states, most recent last
    past: VecDeque<Vec<u8>>,
    /// The state the graph is in now
    present: Option<Vec<u8>>,
    /// States undone, most recently undone last
    future: Vec<Vec<u8>>,
    depth: usize,
}

impl UndoHistory {
    /// `depth` bounds the total number of snapshots, present included
    pub fn new(depth: usize) -> Self {
        Self {
            past: VecDeque::new(),
            present: None,
            future: Vec::new(),
            depth: depth.max(1),
        }
    }

    /// Record the graph's current state. Anything undone is forgotten.
    pub fn record(&mut self, doc: &GraphDocument) -> Result<()> {
        let packed = pack(doc)?;
        if self.present.as_ref() == Some(&packed) {
            return Ok(());
        }

        self.future.clear();
        if let Some(previous) = self.present.replace(packed) {
            self.past.push_back(previous);
        }
        while self.past.len() + 1 > self.depth {
            self.past.pop_front();
        }
        Ok(())
    }

    /// Step back. Returns the state to restore, or `None` at the oldest
    /// recorded state.
    pub fn undo(&mut self) -> Option<Result<GraphDocument>> {
        let previous = self.past.pop_back()?;
        let doc = unpack(&previous);
        if let Some(present) = self.present.replace(previous) {
            self.future.push(present);
        }
        Some(doc)
    }

    /// Step forward again after an undo
    pub fn redo(&mut self) -> Option<Result<GraphDocument>> {
        let next = self.future.pop()?;
        let doc = unpack(&next);
        if let Some(present) = self.present.replace(next) {
            self.past.push_back(present);
        }
        Some(doc)
    }

    /// The most recently recorded or restored state
    pub fn current(&self) -> Option<Result<GraphDocument>> {
        self.present.as_deref().map(unpack)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Number of snapshots held, present included
    pub fn len(&self) -> usize {
        self.past.len() + self.future.len() + usize::from(self.present.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.present.is_none()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.present = None;
        self.future.clear();
    }

    /// Bytes held by all snapshots
    pub fn compressed_size(&self) -> usize {
        self.past
            .iter()
            .chain(self.present.iter())
            .chain(self.future.iter())
            .map(Vec::len)
            .sum()
    }
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}

fn pack(doc: &GraphDocument) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(doc)?;
    zstd::encode_all(&json[..], COMPRESSION_LEVEL).map_err(|e| EngineError::Compression(e.to_string()))
}

fn unpack(packed: &[u8]) -> Result<GraphDocument> {
    let json = zstd::decode_all(packed).map_err(|e| EngineError::Compression(e.to_string()))?;
    Ok(serde_json::from_slice(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::testing;
    use crate::types::Link;

    fn doc(tag: &str) -> GraphDocument {
        GraphDocument {
            nodes: Vec::new(),
            links: vec![Link {
                id: tag.to_string(),
                output_id: "out".to_string(),
                input_id: "in".to_string(),
            }],
        }
    }

    fn tag(doc: Result<GraphDocument>) -> String {
        doc.unwrap().links[0].id.clone()
    }

    #[test]
    fn test_undo_redo_walk() {
        let mut history = UndoHistory::new(10);
        assert!(history.undo().is_none());

        for t in ["one", "two", "three"] {
            history.record(&doc(t)).unwrap();
        }
        assert_eq!(tag(history.current().unwrap()), "three");

        assert_eq!(tag(history.undo().unwrap()), "two");
        assert_eq!(tag(history.undo().unwrap()), "one");
        assert!(history.undo().is_none());
        assert!(history.can_redo());

        assert_eq!(tag(history.redo().unwrap()), "two");
        assert_eq!(tag(history.current().unwrap()), "two");
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_record_after_undo_drops_redo() {
        let mut history = UndoHistory::new(10);
        history.record(&doc("one")).unwrap();
        history.record(&doc("two")).unwrap();
        history.undo();

        history.record(&doc("branch")).unwrap();

        assert!(!history.can_redo());
        assert_eq!(tag(history.undo().unwrap()), "one");
    }

    #[test]
    fn test_identical_state_not_recorded_twice() {
        let mut history = UndoHistory::new(10);
        history.record(&doc("same")).unwrap();
        history.record(&doc("same")).unwrap();
        assert_eq!(history.len(), 1);
        assert!(!history.can_undo());
    }

    #[test]
    fn test_depth_is_bounded() {
        let mut history = UndoHistory::new(3);
        for i in 0..6 {
            history.record(&doc(&format!("s{}", i))).unwrap();
        }
        assert_eq!(history.len(), 3);
        assert_eq!(tag(history.undo().unwrap()), "s4");
        assert_eq!(tag(history.undo().unwrap()), "s3");
        assert!(!history.can_undo());
        assert!(history.compressed_size() > 0);

        history.clear();
        assert!(history.is_empty());
        assert!(history.current().is_none());
    }

    #[test]
    fn test_engine_edit_undone() {
        testing::init_logging();
        let engine = Engine::new(testing::registry());
        let mut history = UndoHistory::default();
        history.record(&engine.snapshot()).unwrap();

        let node_id = engine.create_node("Test/Relay").unwrap();
        history.record(&engine.snapshot()).unwrap();

        engine.restore(history.undo().unwrap().unwrap()).unwrap();
        assert!(engine.nodes().is_empty());

        engine.restore(history.redo().unwrap().unwrap()).unwrap();
        assert!(engine.node(&node_id).is_some());
    }
}
