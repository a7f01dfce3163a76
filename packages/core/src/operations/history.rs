//! Undo/redo history
//!
//! ```text
//!   apply(op)        undo()              redo()
//!  ─────────► [undo] ───────► [redo] ───────► [undo]
//!             stack           stack           stack
//! ```
//!
//! Operations are executed, revoked and re-executed strictly in stack order.
//! A failed step leaves both stacks exactly as they were, so the failed
//! operation can be retried. Applying a new operation discards the redo stack.
//!
//! With consistency checking enabled, a step only counts once the document
//! passes [`Document::check_consistency`]. If the check fails the step is
//! reversed and the stacks are not touched.

use crate::config::EditorConfig;
use crate::graph::RecordGraph;
use crate::operations::{ModelOperation, OperationError, OperationInfo};
use crate::services::Document;
use std::collections::VecDeque;

/// Default number of undoable operations retained
pub const DEFAULT_MAX_UNDO_DEPTH: usize = 100;

pub struct OperationHistory<G: RecordGraph> {
    undo: VecDeque<Box<dyn ModelOperation<G>>>,
    redo: Vec<Box<dyn ModelOperation<G>>>,
    max_depth: usize,
    verify_consistency: bool,
}

impl<G: RecordGraph> Default for OperationHistory<G> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UNDO_DEPTH)
    }
}

impl<G: RecordGraph> OperationHistory<G> {
    /// History retaining at most `max_depth` undoable operations
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            max_depth,
            verify_consistency: false,
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            verify_consistency: config.verify_consistency,
            ..Self::new(config.max_undo_depth)
        }
    }

    /// Execute `op` and push it onto the undo stack
    pub fn apply(
        &mut self,
        doc: &mut Document<G>,
        mut op: Box<dyn ModelOperation<G>>,
    ) -> Result<(), OperationError> {
        op.execute(doc)?;
        if let Err(err) = self.verify(doc) {
            Self::reverse(doc, op.as_mut(), Step::Undo);
            return Err(err);
        }
        tracing::debug!("Applied '{}'", op.name());

        self.redo.clear();
        self.undo.push_back(op);
        while self.undo.len() > self.max_depth {
            if let Some(dropped) = self.undo.pop_front() {
                tracing::trace!("Dropped '{}' from undo history", dropped.name());
            }
        }
        Ok(())
    }

    /// Revoke the most recent operation
    ///
    /// Returns `false` when there is nothing to undo.
    pub fn undo(&mut self, doc: &mut Document<G>) -> Result<bool, OperationError> {
        let Some(mut op) = self.undo.pop_back() else {
            return Ok(false);
        };
        if let Err(err) = op.revoke(doc) {
            self.undo.push_back(op);
            return Err(err);
        }
        if let Err(err) = self.verify(doc) {
            Self::reverse(doc, op.as_mut(), Step::Redo);
            self.undo.push_back(op);
            return Err(err);
        }
        tracing::debug!("Undid '{}'", op.name());
        self.redo.push(op);
        Ok(true)
    }

    /// Re-execute the most recently undone operation
    ///
    /// Returns `false` when there is nothing to redo.
    pub fn redo(&mut self, doc: &mut Document<G>) -> Result<bool, OperationError> {
        let Some(mut op) = self.redo.pop() else {
            return Ok(false);
        };
        if let Err(err) = op.execute(doc) {
            self.redo.push(op);
            return Err(err);
        }
        if let Err(err) = self.verify(doc) {
            Self::reverse(doc, op.as_mut(), Step::Undo);
            self.redo.push(op);
            return Err(err);
        }
        tracing::debug!("Redid '{}'", op.name());
        self.undo.push_back(op);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Name of the operation `undo` would revoke
    pub fn undo_name(&self) -> Option<&'static str> {
        self.undo.back().map(|op| op.name())
    }

    /// Name of the operation `redo` would execute
    pub fn redo_name(&self) -> Option<&'static str> {
        self.redo.last().map(|op| op.name())
    }

    /// Forget all history without touching the document
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    fn verify(&self, doc: &Document<G>) -> Result<(), OperationError> {
        if self.verify_consistency {
            doc.check_consistency()?;
        }
        Ok(())
    }

    /// Take back a step whose consistency check failed
    fn reverse(doc: &mut Document<G>, op: &mut dyn ModelOperation<G>, step: Step) {
        let result = match step {
            Step::Undo => op.revoke(doc),
            Step::Redo => op.execute(doc),
        };
        if let Err(err) = result {
            tracing::error!("Could not reverse '{}' after a failed check: {}", op.name(), err);
        }
    }
}

#[derive(Clone, Copy)]
enum Step {
    Undo,
    Redo,
}
