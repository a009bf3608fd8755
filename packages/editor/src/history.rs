//! # Undo/Redo History
//!
//! Tracks applied actions and replays their inverses.
//!
//! ## Design
//!
//! - Undo applies the inverse of the most recent entry and moves it to the redo stack
//! - Redo reapplies the original action
//! - New actions clear the redo stack, also inside a batch
//! - Batches record several actions as one Complex entry with a title
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = History::new();
//! let mut doc = scl_parser::parse(source)?;
//!
//! history.apply(Delete::capture(&doc, bay)?.into(), &mut doc)?;
//! history.undo(&mut doc)?;
//! history.redo(&mut doc)?;
//! ```

use crate::action::{invert, Complex, EditorAction};
use crate::errors::ActionResult;
use scl_parser::Document;
use tracing::debug;

/// Default number of undo levels
pub const DEFAULT_MAX_LEVELS: usize = 100;

/// Undo/redo stack for document editing
#[derive(Debug)]
pub struct History {
    /// Applied entries (most recent last)
    undo_stack: Vec<EditorAction>,

    /// Undone entries (most recent last)
    redo_stack: Vec<EditorAction>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    /// Batch being recorded
    current_batch: Option<Complex>,
}

impl History {
    pub fn new() -> Self {
        Self::with_max_levels(DEFAULT_MAX_LEVELS)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            current_batch: None,
        }
    }

    /// Apply an action and record it for undo
    pub fn apply(&mut self, action: EditorAction, doc: &mut Document) -> ActionResult<()> {
        action.apply(doc)?;
        self.redo_stack.clear();

        if let Some(batch) = &mut self.current_batch {
            batch.actions.push(action);
        } else {
            self.push_entry(action);
        }

        Ok(())
    }

    /// Start recording actions as one undo step
    pub fn begin_batch(&mut self, title: impl Into<String>) {
        self.current_batch = Some(Complex::new(title, Vec::new()));
    }

    /// Close the current batch and push it as a single Complex entry
    pub fn end_batch(&mut self) {
        if let Some(batch) = self.current_batch.take() {
            if !batch.actions.is_empty() {
                self.push_entry(batch.into());
            }
        }
    }

    pub fn is_batching(&self) -> bool {
        self.current_batch.is_some()
    }

    fn push_entry(&mut self, action: EditorAction) {
        self.undo_stack.push(action);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        self.redo_stack.clear();
    }

    /// Undo the most recent entry; `false` when there is nothing to undo
    pub fn undo(&mut self, doc: &mut Document) -> ActionResult<bool> {
        let Some(action) = self.undo_stack.pop() else {
            return Ok(false);
        };

        if let Err(err) = invert(&action).apply(doc) {
            self.undo_stack.push(action);
            return Err(err);
        }

        debug!(entry = action.title(), "undo");
        self.redo_stack.push(action);
        Ok(true)
    }

    /// Redo the most recently undone entry; `false` when there is nothing to redo
    pub fn redo(&mut self, doc: &mut Document) -> ActionResult<bool> {
        let Some(action) = self.redo_stack.pop() else {
            return Ok(false);
        };

        if let Err(err) = action.apply(doc) {
            self.redo_stack.push(action);
            return Err(err);
        }

        debug!(entry = action.title(), "redo");
        self.undo_stack.push(action);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    /// Clear all undo/redo history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_batch = None;
    }

    /// Title of the next undo entry
    pub fn undo_title(&self) -> Option<&str> {
        self.undo_stack.last().map(EditorAction::title)
    }

    /// Title of the next redo entry
    pub fn redo_title(&self) -> Option<&str> {
        self.redo_stack.last().map(EditorAction::title)
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{AttributeMap, Delete, Update};
    use scl_parser::{parse, serialize, NodeId};

    fn sample() -> Document {
        parse(r#"<SCL><Substation name="AA1"><VoltageLevel name="E1"/><VoltageLevel name="E2"/></Substation></SCL>"#)
            .unwrap()
    }

    fn first_level(doc: &Document) -> NodeId {
        doc.query_selector("VoltageLevel").unwrap().unwrap()
    }

    fn rename(doc: &Document, id: NodeId, name: &str) -> EditorAction {
        let attributes: AttributeMap = [("name".to_string(), Some(name.to_string()))].into_iter().collect();
        Update::capture(doc, id, attributes).unwrap().into()
    }

    #[test]
    fn test_history_creation() {
        let history = History::new();
        assert_eq!(history.undo_levels(), 0);
        assert_eq!(history.redo_levels(), 0);
        assert_eq!(history.max_levels(), 100);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_apply_undo_redo() {
        let mut doc = sample();
        let original = serialize(&doc);
        let mut history = History::new();
        let level = first_level(&doc);

        history.apply(rename(&doc, level, "E9"), &mut doc).unwrap();
        let renamed = serialize(&doc);
        assert_eq!(doc.attribute(level, "name"), Some("E9"));
        assert_eq!(history.undo_title(), Some("Update"));

        assert!(history.undo(&mut doc).unwrap());
        assert_eq!(serialize(&doc), original);
        assert!(history.can_redo());

        assert!(history.redo(&mut doc).unwrap());
        assert_eq!(serialize(&doc), renamed);
        assert_eq!(history.redo_levels(), 0);

        assert!(history.undo(&mut doc).unwrap());
        assert!(!history.undo(&mut doc).unwrap());
    }

    #[test]
    fn test_batch_is_one_entry() {
        let mut doc = sample();
        let original = serialize(&doc);
        let mut history = History::new();
        let level = first_level(&doc);

        history.begin_batch("Rename and delete");
        history.apply(rename(&doc, level, "E9"), &mut doc).unwrap();
        history
            .apply(Delete::capture(&doc, level).unwrap().into(), &mut doc)
            .unwrap();
        history.end_batch();

        assert_eq!(history.undo_levels(), 1);
        assert_eq!(history.undo_title(), Some("Rename and delete"));

        history.undo(&mut doc).unwrap();
        assert_eq!(serialize(&doc), original);
    }

    #[test]
    fn test_empty_batch_is_dropped() {
        let mut history = History::new();
        history.begin_batch("nothing");
        assert!(history.is_batching());
        history.end_batch();
        assert_eq!(history.undo_levels(), 0);
    }

    #[test]
    fn test_new_action_clears_redo() {
        let mut doc = sample();
        let mut history = History::new();
        let level = first_level(&doc);

        history.apply(rename(&doc, level, "A"), &mut doc).unwrap();
        history.undo(&mut doc).unwrap();
        assert_eq!(history.redo_levels(), 1);

        history.apply(rename(&doc, level, "B"), &mut doc).unwrap();
        assert_eq!(history.redo_levels(), 0);
    }

    #[test]
    fn test_batched_action_clears_redo() {
        let mut doc = sample();
        let mut history = History::new();
        let level = first_level(&doc);

        history.apply(rename(&doc, level, "A"), &mut doc).unwrap();
        history.undo(&mut doc).unwrap();
        assert_eq!(history.redo_levels(), 1);

        history.begin_batch("Rename");
        history.apply(rename(&doc, level, "B"), &mut doc).unwrap();
        assert_eq!(history.redo_levels(), 0);
        assert!(!history.redo(&mut doc).unwrap());
        assert_eq!(doc.attribute(level, "name"), Some("B"));

        history.end_batch();
        assert_eq!(history.undo_title(), Some("Rename"));
    }

    #[test]
    fn test_failed_batched_apply_keeps_redo() {
        let mut doc = sample();
        let mut history = History::new();
        let level = first_level(&doc);
        let delete = Delete::capture(&doc, level).unwrap();

        history.apply(rename(&doc, level, "A"), &mut doc).unwrap();
        history.undo(&mut doc).unwrap();

        history.begin_batch("Delete twice");
        doc.detach(level).unwrap();
        assert!(history.apply(delete.into(), &mut doc).is_err());
        assert_eq!(history.redo_levels(), 1);
    }

    #[test]
    fn test_max_levels_enforced() {
        let mut doc = sample();
        let mut history = History::with_max_levels(2);
        let level = first_level(&doc);

        for i in 0..3 {
            let action = rename(&doc, level, &format!("E{}", i));
            history.apply(action, &mut doc).unwrap();
        }

        assert_eq!(history.undo_levels(), 2);
    }

    #[test]
    fn test_failed_apply_is_not_recorded() {
        let mut doc = sample();
        let mut history = History::new();
        let level = first_level(&doc);
        let delete = Delete::capture(&doc, level).unwrap();

        history.apply(delete.clone().into(), &mut doc).unwrap();
        assert!(history.apply(delete.into(), &mut doc).is_err());
        assert_eq!(history.undo_levels(), 1);
    }
}
