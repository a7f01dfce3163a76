//! Value list insert/remove
//!
//! Property lists and binary lists hold primitive elements rather than
//! records. Each element is shown as a list item wrapping one leaf, and is
//! edited in place with [`SetPropertyOperation`] or [`SetContentOperation`].
//!
//! [`SetPropertyOperation`]: crate::operations::SetPropertyOperation
//! [`SetContentOperation`]: crate::operations::SetContentOperation

use crate::graph::{RecordGraph, SlotRef};
use crate::models::{ListValue, NodeId, NodeKind, Position, PropertyValue, RecordId, SlotKind};
use crate::operations::transaction::Transaction;
use crate::operations::{
    attached_kind, misuse, ModelOperation, OperationError, OperationInfo, OperationState,
};
use crate::services::Document;

/// List node, owner record and slot of a value list
fn value_list<G: RecordGraph>(
    doc: &Document<G>,
    list: NodeId,
) -> Result<(SlotRef, RecordId, SlotKind), OperationError> {
    match attached_kind(doc, list)? {
        NodeKind::PropertyList { .. } => {}
        other => {
            return Err(OperationError::invalid_target(
                list,
                format!("expected a property list node, found {}", other.name()),
            ))
        }
    }
    let kind = doc.slot_def(list)?.kind;
    if kind.element_kind().is_none() {
        return Err(OperationError::invalid_target(
            list,
            "list holds records, not values",
        ));
    }
    let slot = doc.slot_of_node(list)?;
    let record = slot
        .owner_record()
        .ok_or_else(|| OperationError::invalid_target(list, "value list has no record"))?;
    Ok((slot, record, kind))
}

/// Insert one element into a property list or binary list
#[derive(Debug)]
pub struct InsertValueOperation {
    list: NodeId,
    slot: SlotRef,
    record: RecordId,
    position: Position,
    value: ListValue,
    /// List item built on the first execute, reattached on later ones
    item: Option<NodeId>,
    /// Index the element was inserted at, set while executed
    applied: Option<usize>,
}

impl InsertValueOperation {
    const NAME: &'static str = "insert_value";

    pub fn new<G: RecordGraph>(
        doc: &Document<G>,
        list: NodeId,
        position: Position,
        value: ListValue,
    ) -> Result<Self, OperationError> {
        let (slot, record, kind) = value_list(doc, list)?;
        match (kind, &value) {
            (SlotKind::PropertyList, ListValue::Property(_))
            | (SlotKind::BinaryList, ListValue::Binary(_)) => {}
            _ => {
                return Err(crate::graph::GraphError::ValueMismatch {
                    slot: slot.clone(),
                    kind,
                }
                .into())
            }
        }
        let len = doc.tree().child_count(list);
        if position.resolve(len).is_none() {
            return Err(OperationError::invalid_target(
                list,
                format!("position {:?} is out of range for {} items", position, len),
            ));
        }
        Ok(Self {
            list,
            slot,
            record,
            position,
            value,
            item: None,
            applied: None,
        })
    }

    /// Insert an empty element: an empty string or an empty byte buffer
    pub fn empty<G: RecordGraph>(
        doc: &Document<G>,
        list: NodeId,
        position: Position,
    ) -> Result<Self, OperationError> {
        let value = match value_list(doc, list)?.2 {
            SlotKind::BinaryList => ListValue::Binary(Vec::new()),
            _ => ListValue::Property(PropertyValue::Text(String::new())),
        };
        Self::new(doc, list, position, value)
    }

    /// List item holding the inserted element, once executed
    pub fn item(&self) -> Option<NodeId> {
        self.item
    }
}

impl OperationInfo for InsertValueOperation {
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

impl<G: RecordGraph> ModelOperation<G> for InsertValueOperation {
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
        let item = match self.item {
            Some(item) => item,
            None => {
                let item = doc.build_value_node(&self.slot)?;
                self.item = Some(item);
                item
            }
        };
        let (record, slot) = (self.record, self.slot.slot.as_str());
        let value = self.value.clone();

        Transaction::run(doc, Self::NAME, |tx| {
            tx.insert_value(record, slot, index, value)?;
            tx.attach(list, item, index)
        })?;

        tracing::debug!("Inserted value into {} at index {}", self.slot, index);
        self.applied = Some(index);
        Ok(())
    }

    fn revoke(&mut self, doc: &mut Document<G>) -> Result<(), OperationError> {
        let (Some(index), Some(item)) = (self.applied, self.item) else {
            return Err(misuse(Self::NAME, "revoke", OperationState::Pending));
        };
        let (list, record, slot) = (self.list, self.record, self.slot.slot.as_str());

        Transaction::run(doc, Self::NAME, |tx| {
            tx.remove_value(record, slot, index)?;
            tx.detach(list, item)
        })?;

        tracing::debug!("Revoked value insert into {} at index {}", self.slot, index);
        self.applied = None;
        Ok(())
    }
}

/// Remove one element from a property list or binary list
///
/// The target may be the list item or the leaf it wraps.
#[derive(Debug)]
pub struct RemoveValueOperation {
    list: NodeId,
    item: NodeId,
    slot: SlotRef,
    record: RecordId,
    /// Former index and the removed element, set while executed
    applied: Option<(usize, ListValue)>,
}

impl RemoveValueOperation {
    const NAME: &'static str = "remove_value";

    pub fn new<G: RecordGraph>(doc: &Document<G>, node: NodeId) -> Result<Self, OperationError> {
        let item = match attached_kind(doc, node)? {
            NodeKind::ListItem => node,
            NodeKind::Property { .. } | NodeKind::Content { .. } => match doc.tree().parent(node) {
                Some(parent) if doc.tree().kind(parent) == Some(&NodeKind::ListItem) => parent,
                _ => {
                    return Err(OperationError::invalid_target(
                        node,
                        "leaf is not a list element",
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
        let (slot, record, _) = value_list(doc, list)?;
        Ok(Self {
            list,
            item,
            slot,
            record,
            applied: None,
        })
    }

    /// Element removed by the last execute, if executed
    pub fn removed(&self) -> Option<&ListValue> {
        self.applied.as_ref().map(|(_, value)| value)
    }
}

impl OperationInfo for RemoveValueOperation {
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

impl<G: RecordGraph> ModelOperation<G> for RemoveValueOperation {
    fn execute(&mut self, doc: &mut Document<G>) -> Result<(), OperationError> {
        if self.applied.is_some() {
            return Err(misuse(Self::NAME, "execute", OperationState::Executed));
        }
        let (list, item, record) = (self.list, self.item, self.record);
        let slot = self.slot.slot.as_str();
        let index = doc
            .tree()
            .index_of(list, item)
            .ok_or_else(|| OperationError::invalid_target(item, "list item is not attached"))?;

        let value = Transaction::run(doc, Self::NAME, |tx| {
            let value = tx.remove_value(record, slot, index)?;
            tx.detach(list, item)?;
            Ok(value)
        })?;

        tracing::debug!("Removed value from {} at index {}", self.slot, index);
        self.applied = Some((index, value));
        Ok(())
    }

    fn revoke(&mut self, doc: &mut Document<G>) -> Result<(), OperationError> {
        let Some((index, value)) = self.applied.clone() else {
            return Err(misuse(Self::NAME, "revoke", OperationState::Pending));
        };
        let (list, item, record) = (self.list, self.item, self.record);
        let slot = self.slot.slot.as_str();

        Transaction::run(doc, Self::NAME, |tx| {
            tx.insert_value(record, slot, index, value)?;
            tx.attach(list, item, index)
        })?;

        tracing::debug!("Restored value to {} at index {}", self.slot, index);
        self.applied = None;
        Ok(())
    }
}
