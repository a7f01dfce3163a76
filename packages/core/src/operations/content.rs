//! Leaf value edits
//!
//! Content and property nodes have no children; editing them only touches the
//! record graph. The previous value is captured on execute and written back on
//! revoke.
//!
//! A leaf under a list item stands for one element of a value list. Editing it
//! replaces that element; the element index is read from the tree at execute
//! time. Elements cannot be cleared, only removed with
//! [`RemoveValueOperation`](crate::operations::RemoveValueOperation).

use crate::graph::RecordGraph;
use crate::models::{ListValue, NodeId, NodeKind, PropertyValue, RecordId};
use crate::operations::transaction::Transaction;
use crate::operations::{
    attached_kind, misuse, ModelOperation, OperationError, OperationInfo, OperationState,
};
use crate::services::Document;

/// Where the value behind a leaf lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leaf {
    /// Single-valued slot of the record
    Slot,
    /// Element of a value list, addressed through its list item
    Element { item: NodeId },
}

/// Record, slot and location behind a leaf node of the expected kind
fn leaf_target<G: RecordGraph>(
    doc: &Document<G>,
    node: NodeId,
    content: bool,
) -> Result<(RecordId, String, Leaf), OperationError> {
    let slot = match (attached_kind(doc, node)?, content) {
        (NodeKind::Content { slot }, true) | (NodeKind::Property { slot }, false) => slot.clone(),
        (other, _) => {
            return Err(OperationError::invalid_target(
                node,
                format!(
                    "expected a {} node, found {}",
                    if content { "content" } else { "property" },
                    other.name()
                ),
            ))
        }
    };
    let record = doc
        .tree()
        .parent_record(node)
        .ok_or_else(|| OperationError::invalid_target(node, "leaf has no record"))?;
    let leaf = match doc.tree().parent(node) {
        Some(item) if doc.tree().kind(item) == Some(&NodeKind::ListItem) => Leaf::Element { item },
        _ => Leaf::Slot,
    };
    Ok((record, slot, leaf))
}

/// Current index of an element's list item
fn element_index<G: RecordGraph>(
    doc: &Document<G>,
    item: NodeId,
) -> Result<usize, OperationError> {
    doc.tree()
        .parent_index(item)
        .ok_or_else(|| OperationError::invalid_target(item, "list item is not attached"))
}

fn cleared_element(node: NodeId) -> OperationError {
    OperationError::invalid_target(node, "list elements are removed, not cleared")
}

/// Set or clear the binary content behind a content node
#[derive(Debug)]
pub struct SetContentOperation {
    record: RecordId,
    slot: String,
    leaf: Leaf,
    bytes: Option<Vec<u8>>,
    /// Content replaced by the last execute
    applied: Option<Option<Vec<u8>>>,
}

impl SetContentOperation {
    const NAME: &'static str = "set_content";

    /// `None` clears the content; elements of a binary list need bytes
    pub fn new<G: RecordGraph>(
        doc: &Document<G>,
        node: NodeId,
        bytes: Option<Vec<u8>>,
    ) -> Result<Self, OperationError> {
        let (record, slot, leaf) = leaf_target(doc, node, true)?;
        if leaf != Leaf::Slot && bytes.is_none() {
            return Err(cleared_element(node));
        }
        Ok(Self {
            record,
            slot,
            leaf,
            bytes,
            applied: None,
        })
    }

    fn write<G: RecordGraph>(
        &self,
        doc: &mut Document<G>,
        bytes: Option<Vec<u8>>,
    ) -> Result<Option<Vec<u8>>, OperationError> {
        let (record, slot) = (self.record, self.slot.as_str());
        match self.leaf {
            Leaf::Slot => Transaction::run(doc, Self::NAME, |tx| {
                tx.set_content(record, slot, bytes)
            }),
            Leaf::Element { item } => {
                let index = element_index(doc, item)?;
                let value = ListValue::Binary(bytes.ok_or_else(|| cleared_element(item))?);
                let previous = Transaction::run(doc, Self::NAME, |tx| {
                    tx.replace_value(record, slot, index, value)
                })?;
                Ok(previous.into_bytes())
            }
        }
    }
}

impl OperationInfo for SetContentOperation {
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

impl<G: RecordGraph> ModelOperation<G> for SetContentOperation {
    fn execute(&mut self, doc: &mut Document<G>) -> Result<(), OperationError> {
        if self.applied.is_some() {
            return Err(misuse(Self::NAME, "execute", OperationState::Executed));
        }
        let previous = self.write(doc, self.bytes.clone())?;
        tracing::debug!(
            "Set {} bytes of {}.{}",
            self.bytes.as_ref().map_or(0, Vec::len),
            self.record,
            self.slot
        );
        self.applied = Some(previous);
        Ok(())
    }

    fn revoke(&mut self, doc: &mut Document<G>) -> Result<(), OperationError> {
        let Some(previous) = self.applied.clone() else {
            return Err(misuse(Self::NAME, "revoke", OperationState::Pending));
        };
        self.write(doc, previous)?;
        tracing::debug!("Restored content of {}.{}", self.record, self.slot);
        self.applied = None;
        Ok(())
    }
}

/// Set or clear the primitive value behind a property node
#[derive(Debug)]
pub struct SetPropertyOperation {
    record: RecordId,
    slot: String,
    leaf: Leaf,
    value: Option<PropertyValue>,
    applied: Option<Option<PropertyValue>>,
}

impl SetPropertyOperation {
    const NAME: &'static str = "set_property";

    pub fn new<G: RecordGraph>(
        doc: &Document<G>,
        node: NodeId,
        value: Option<PropertyValue>,
    ) -> Result<Self, OperationError> {
        let (record, slot, leaf) = leaf_target(doc, node, false)?;
        if leaf != Leaf::Slot && value.is_none() {
            return Err(cleared_element(node));
        }
        Ok(Self {
            record,
            slot,
            leaf,
            value,
            applied: None,
        })
    }

    fn write<G: RecordGraph>(
        &self,
        doc: &mut Document<G>,
        value: Option<PropertyValue>,
    ) -> Result<Option<PropertyValue>, OperationError> {
        let (record, slot) = (self.record, self.slot.as_str());
        match self.leaf {
            Leaf::Slot => Transaction::run(doc, Self::NAME, |tx| {
                tx.set_property(record, slot, value)
            }),
            Leaf::Element { item } => {
                let index = element_index(doc, item)?;
                let value = ListValue::Property(value.ok_or_else(|| cleared_element(item))?);
                let previous = Transaction::run(doc, Self::NAME, |tx| {
                    tx.replace_value(record, slot, index, value)
                })?;
                Ok(previous.into_property())
            }
        }
    }
}

impl OperationInfo for SetPropertyOperation {
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

impl<G: RecordGraph> ModelOperation<G> for SetPropertyOperation {
    fn execute(&mut self, doc: &mut Document<G>) -> Result<(), OperationError> {
        if self.applied.is_some() {
            return Err(misuse(Self::NAME, "execute", OperationState::Executed));
        }
        let previous = self.write(doc, self.value.clone())?;
        tracing::debug!("Set {}.{} to {:?}", self.record, self.slot, self.value);
        self.applied = Some(previous);
        Ok(())
    }

    fn revoke(&mut self, doc: &mut Document<G>) -> Result<(), OperationError> {
        let Some(previous) = self.applied.clone() else {
            return Err(misuse(Self::NAME, "revoke", OperationState::Pending));
        };
        self.write(doc, previous)?;
        tracing::debug!("Restored {}.{}", self.record, self.slot);
        self.applied = None;
        Ok(())
    }
}
