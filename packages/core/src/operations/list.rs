//! List slot insert/remove
//!
//! List order is index based: removing an element shifts every later element
//! down by one in both the graph and the tree, and revoke puts the element back
//! at its former index.

use crate::graph::{RecordGraph, SlotRef};
use crate::models::{NodeId, NodeKind, Position, RecordId};
use crate::operations::transaction::Transaction;
use crate::operations::{
    attached_kind, cached_node, check_detached_record, create_for_slot, misuse, record_under,
    ModelOperation, OperationError, OperationInfo, OperationState,
};
use crate::services::Document;

/// Insert a record into a list slot
#[derive(Debug)]
pub struct InsertListItemOperation {
    list: NodeId,
    slot: SlotRef,
    position: Position,
    record: RecordId,
    /// List item built on the first execute, reattached on later ones
    item: Option<NodeId>,
    /// Index the element was inserted at, set while executed
    applied: Option<usize>,
}

impl InsertListItemOperation {
    const NAME: &'static str = "insert_list_item";

    /// Insert a fresh record of `record_type` at `position` of `list`
    pub fn new<G: RecordGraph>(
        doc: &mut Document<G>,
        list: NodeId,
        position: Position,
        record_type: &str,
    ) -> Result<Self, OperationError> {
        let slot = list_slot(doc, list, position)?;
        let record = create_for_slot(doc, &slot, record_type)?;
        Ok(Self {
            list,
            slot,
            position,
            record,
            item: None,
            applied: None,
        })
    }

    /// Insert an existing, unattached record
    pub fn with_record<G: RecordGraph>(
        doc: &Document<G>,
        list: NodeId,
        position: Position,
        record: RecordId,
    ) -> Result<Self, OperationError> {
        let slot = list_slot(doc, list, position)?;
        check_detached_record(doc, &slot, record)?;
        Ok(Self {
            list,
            slot,
            position,
            record,
            item: None,
            applied: None,
        })
    }

    pub fn record(&self) -> RecordId {
        self.record
    }

    /// List item wrapping the inserted record, once executed
    pub fn item(&self) -> Option<NodeId> {
        self.item
    }
}

fn list_slot<G: RecordGraph>(
    doc: &Document<G>,
    list: NodeId,
    position: Position,
) -> Result<SlotRef, OperationError> {
    match attached_kind(doc, list)? {
        NodeKind::PropertyList { .. } => {}
        other => {
            return Err(OperationError::invalid_target(
                list,
                format!("expected a property list node, found {}", other.name()),
            ))
        }
    }
    let len = doc.tree().child_count(list);
    if position.resolve(len).is_none() {
        return Err(OperationError::invalid_target(
            list,
            format!("position {:?} is out of range for {} items", position, len),
        ));
    }
    Ok(doc.slot_of_node(list)?)
}

impl OperationInfo for InsertListItemOperation {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn state(&self) -> OperationState {
        match self.applied {
            Some(_) => OperationState::Executed,
            None => OperationState::Pending,
        }
    }
}

impl<G: RecordGraph> ModelOperation<G> for InsertListItemOperation {
    fn execute(&mut self, doc: &mut Document<G>) -> Result<(), OperationError> {
        if self.applied.is_some() {
            return Err(misuse(Self::NAME, "execute", OperationState::Executed));
        }
        let list = self.list;
        let len = doc.tree().child_count(list);
        let index = self.position.resolve(len).ok_or_else(|| {
            OperationError::invalid_target(
                list,
                format!("position {:?} is out of range for {} items", self.position, len),
            )
        })?;
        let record = self.record;
        let item = cached_node(doc, &mut self.item, record, &self.slot)?;
        let slot = &self.slot;

        Transaction::run(doc, Self::NAME, |tx| {
            tx.connect(slot, record, index)?;
            tx.attach(list, item, index)
        })?;

        tracing::debug!("Inserted {} into {} at index {}", record, self.slot, index);
        self.applied = Some(index);
        Ok(())
    }

    fn revoke(&mut self, doc: &mut Document<G>) -> Result<(), OperationError> {
        let (Some(_), Some(item)) = (self.applied, self.item) else {
            return Err(misuse(Self::NAME, "revoke", OperationState::Pending));
        };
        let (list, record) = (self.list, self.record);
        let slot = &self.slot;

        Transaction::run(doc, Self::NAME, |tx| {
            tx.disconnect(slot, record)?;
            tx.detach(list, item)
        })?;

        tracing::debug!("Revoked insert of {} into {}", record, self.slot);
        self.applied = None;
        Ok(())
    }
}

/// Remove one element from a list slot
///
/// The target may be the list item or the record node it wraps.
#[derive(Debug)]
pub struct RemoveListItemOperation {
    list: NodeId,
    item: NodeId,
    slot: SlotRef,
    record: RecordId,
    /// Former graph and tree indices, set while executed
    applied: Option<(usize, usize)>,
}

impl RemoveListItemOperation {
    const NAME: &'static str = "remove_list_item";

    pub fn new<G: RecordGraph>(doc: &Document<G>, node: NodeId) -> Result<Self, OperationError> {
        let item = match attached_kind(doc, node)? {
            NodeKind::ListItem => node,
            NodeKind::Record { .. } => match doc.tree().parent(node) {
                Some(parent) if doc.tree().kind(parent) == Some(&NodeKind::ListItem) => parent,
                _ => {
                    return Err(OperationError::invalid_target(
                        node,
                        "record is not a list element",
                    ))
                }
            },
            other => {
                return Err(OperationError::invalid_target(
                    node,
                    format!("expected a list item node, found {}", other.name()),
                ))
            }
        };
        let list = doc
            .tree()
            .parent(item)
            .ok_or_else(|| OperationError::invalid_target(item, "list item has no parent"))?;
        let (_, record) = record_under(doc, item)?;
        Ok(Self {
            list,
            item,
            slot: doc.slot_of_node(list)?,
            record,
            applied: None,
        })
    }

    pub fn record(&self) -> RecordId {
        self.record
    }
}

impl OperationInfo for RemoveListItemOperation {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn state(&self) -> OperationState {
        match self.applied {
            Some(_) => OperationState::Executed,
            None => OperationState::Pending,
        }
    }
}

impl<G: RecordGraph> ModelOperation<G> for RemoveListItemOperation {
    fn execute(&mut self, doc: &mut Document<G>) -> Result<(), OperationError> {
        if self.applied.is_some() {
            return Err(misuse(Self::NAME, "execute", OperationState::Executed));
        }
        let (list, item, record) = (self.list, self.item, self.record);
        let slot = &self.slot;

        let indices = Transaction::run(doc, Self::NAME, |tx| {
            let graph_index = tx.disconnect(slot, record)?;
            let tree_index = tx.detach(list, item)?;
            Ok((graph_index, tree_index))
        })?;

        tracing::debug!("Removed {} from {} at index {}", record, self.slot, indices.0);
        self.applied = Some(indices);
        Ok(())
    }

    fn revoke(&mut self, doc: &mut Document<G>) -> Result<(), OperationError> {
        let Some((graph_index, tree_index)) = self.applied else {
            return Err(misuse(Self::NAME, "revoke", OperationState::Pending));
        };
        let (list, item, record) = (self.list, self.item, self.record);
        let slot = &self.slot;

        Transaction::run(doc, Self::NAME, |tx| {
            tx.connect(slot, record, graph_index)?;
            tx.attach(list, item, tree_index)
        })?;

        tracing::debug!("Restored {} to {} at index {}", record, self.slot, graph_index);
        self.applied = None;
        Ok(())
    }
}
