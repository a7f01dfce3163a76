//! Journaled mutation of a document
//!
//! Operations mutate graph and tree only through a `Transaction`. Each
//! successful step is journaled; if the operation body fails, the journal is
//! replayed backwards so the document returns to its state before the call.

use crate::graph::{RecordGraph, SlotRef};
use crate::models::{ListValue, NodeId, Position, PropertyValue, RecordId};
use crate::operations::OperationError;
use crate::services::Document;

enum Step {
    Connected {
        slot: SlotRef,
        record: RecordId,
    },
    Disconnected {
        slot: SlotRef,
        record: RecordId,
        index: usize,
    },
    Attached {
        parent: NodeId,
        node: NodeId,
    },
    Detached {
        parent: NodeId,
        node: NodeId,
        index: usize,
    },
    ContentSet {
        record: RecordId,
        slot: String,
        previous: Option<Vec<u8>>,
    },
    PropertySet {
        record: RecordId,
        slot: String,
        previous: Option<PropertyValue>,
    },
    ValueInserted {
        record: RecordId,
        slot: String,
        index: usize,
    },
    ValueRemoved {
        record: RecordId,
        slot: String,
        index: usize,
        value: ListValue,
    },
    ValueReplaced {
        record: RecordId,
        slot: String,
        index: usize,
        previous: ListValue,
    },
}

impl Step {
    fn undo<G: RecordGraph>(self, doc: &mut Document<G>) -> Result<(), OperationError> {
        match self {
            Step::Connected { slot, record } => {
                doc.graph_mut().disconnect(&slot, record)?;
            }
            Step::Disconnected { slot, record, index } => {
                doc.graph_mut().connect(&slot, record, index)?;
            }
            Step::Attached { parent, node } => {
                doc.tree_mut().remove_child(parent, node)?;
            }
            Step::Detached { parent, node, index } => {
                doc.tree_mut().add(parent, node, Position::At(index))?;
            }
            Step::ContentSet {
                record,
                slot,
                previous,
            } => {
                doc.graph_mut().set_content(record, &slot, previous)?;
            }
            Step::PropertySet {
                record,
                slot,
                previous,
            } => {
                doc.graph_mut().set_property(record, &slot, previous)?;
            }
            Step::ValueInserted {
                record,
                slot,
                index,
            } => {
                doc.graph_mut().remove_value(record, &slot, index)?;
            }
            Step::ValueRemoved {
                record,
                slot,
                index,
                value,
            } => {
                doc.graph_mut().insert_value(record, &slot, index, value)?;
            }
            Step::ValueReplaced {
                record,
                slot,
                index,
                previous,
            } => {
                doc.graph_mut().replace_value(record, &slot, index, previous)?;
            }
        }
        Ok(())
    }
}

pub(crate) struct Transaction<'d, G: RecordGraph> {
    doc: &'d mut Document<G>,
    operation: &'static str,
    steps: Vec<Step>,
}

impl<'d, G: RecordGraph> Transaction<'d, G> {
    /// Run `body` against `doc`, rolling back its completed steps on failure
    pub(crate) fn run<T>(
        doc: &'d mut Document<G>,
        operation: &'static str,
        body: impl FnOnce(&mut Self) -> Result<T, OperationError>,
    ) -> Result<T, OperationError> {
        let mut tx = Self {
            doc,
            operation,
            steps: Vec::new(),
        };
        match body(&mut tx) {
            Ok(value) => Ok(value),
            Err(cause) => Err(tx.rollback(cause)),
        }
    }

    pub(crate) fn connect(
        &mut self,
        slot: &SlotRef,
        record: RecordId,
        index: usize,
    ) -> Result<(), OperationError> {
        self.doc.graph_mut().connect(slot, record, index)?;
        self.steps.push(Step::Connected {
            slot: slot.clone(),
            record,
        });
        Ok(())
    }

    /// Disconnect `record` from `slot`, returning its former index
    pub(crate) fn disconnect(
        &mut self,
        slot: &SlotRef,
        record: RecordId,
    ) -> Result<usize, OperationError> {
        let index = self.doc.graph_mut().disconnect(slot, record)?;
        self.steps.push(Step::Disconnected {
            slot: slot.clone(),
            record,
            index,
        });
        Ok(index)
    }

    pub(crate) fn attach(
        &mut self,
        parent: NodeId,
        node: NodeId,
        index: usize,
    ) -> Result<(), OperationError> {
        self.doc.tree_mut().add(parent, node, Position::At(index))?;
        self.steps.push(Step::Attached { parent, node });
        Ok(())
    }

    /// Detach `node` from `parent`, returning its former index
    pub(crate) fn detach(&mut self, parent: NodeId, node: NodeId) -> Result<usize, OperationError> {
        let index = self.doc.tree_mut().remove_child(parent, node)?;
        self.steps.push(Step::Detached {
            parent,
            node,
            index,
        });
        Ok(index)
    }

    pub(crate) fn set_content(
        &mut self,
        record: RecordId,
        slot: &str,
        bytes: Option<Vec<u8>>,
    ) -> Result<Option<Vec<u8>>, OperationError> {
        let previous = self.doc.graph_mut().set_content(record, slot, bytes)?;
        self.steps.push(Step::ContentSet {
            record,
            slot: slot.to_string(),
            previous: previous.clone(),
        });
        Ok(previous)
    }

    pub(crate) fn set_property(
        &mut self,
        record: RecordId,
        slot: &str,
        value: Option<PropertyValue>,
    ) -> Result<Option<PropertyValue>, OperationError> {
        let previous = self.doc.graph_mut().set_property(record, slot, value)?;
        self.steps.push(Step::PropertySet {
            record,
            slot: slot.to_string(),
            previous: previous.clone(),
        });
        Ok(previous)
    }

    pub(crate) fn insert_value(
        &mut self,
        record: RecordId,
        slot: &str,
        index: usize,
        value: ListValue,
    ) -> Result<(), OperationError> {
        self.doc.graph_mut().insert_value(record, slot, index, value)?;
        self.steps.push(Step::ValueInserted {
            record,
            slot: slot.to_string(),
            index,
        });
        Ok(())
    }

    /// Remove the element at `index`, returning it
    pub(crate) fn remove_value(
        &mut self,
        record: RecordId,
        slot: &str,
        index: usize,
    ) -> Result<ListValue, OperationError> {
        let value = self.doc.graph_mut().remove_value(record, slot, index)?;
        self.steps.push(Step::ValueRemoved {
            record,
            slot: slot.to_string(),
            index,
            value: value.clone(),
        });
        Ok(value)
    }

    /// Replace the element at `index`, returning the previous one
    pub(crate) fn replace_value(
        &mut self,
        record: RecordId,
        slot: &str,
        index: usize,
        value: ListValue,
    ) -> Result<ListValue, OperationError> {
        let previous = self.doc.graph_mut().replace_value(record, slot, index, value)?;
        self.steps.push(Step::ValueReplaced {
            record,
            slot: slot.to_string(),
            index,
            previous: previous.clone(),
        });
        Ok(previous)
    }

    fn rollback(self, cause: OperationError) -> OperationError {
        let Self {
            doc,
            operation,
            steps,
        } = self;
        if steps.is_empty() {
            return cause;
        }

        tracing::warn!(
            "Rolling back {} step(s) of '{}' after failure: {}",
            steps.len(),
            operation,
            cause
        );
        for step in steps.into_iter().rev() {
            if let Err(err) = step.undo(doc) {
                tracing::error!("Rollback of '{}' failed: {}", operation, err);
                return OperationError::rollback_failed(operation, cause, err);
            }
        }
        cause
    }
}
