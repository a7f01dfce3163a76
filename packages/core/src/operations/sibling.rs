//! Message-level and reordering operations
//!
//! - `InsertSiblingOperation` adds a fresh top-level record; it never replaces
//! - `RemoveRecordOperation` removes a top-level record or vacates a single slot
//! - `MoveRecordOperation` reorders a record within the message or a list

use crate::graph::{RecordGraph, SlotRef};
use crate::models::{NodeId, NodeKind, Position, RecordId};
use crate::operations::transaction::Transaction;
use crate::operations::{
    attached_kind, cached_node, create_for_slot, misuse, record_under, ModelOperation,
    OperationError, OperationInfo, OperationState,
};
use crate::services::Document;

/// Insert a new record of a given type into the message sequence
#[derive(Debug)]
pub struct InsertSiblingOperation {
    position: Position,
    record: RecordId,
    /// Node built on the first execute, reattached on later ones
    node: Option<NodeId>,
    /// Message index the record was inserted at, set while executed
    applied: Option<usize>,
}

impl InsertSiblingOperation {
    const NAME: &'static str = "insert_sibling";

    /// Insert at `position` of the message (`Position::End` appends)
    pub fn new<G: RecordGraph>(
        doc: &mut Document<G>,
        position: Position,
        record_type: &str,
    ) -> Result<Self, OperationError> {
        let root = doc.root();
        let len = doc.tree().child_count(root);
        if position.resolve(len).is_none() {
            return Err(OperationError::invalid_target(
                root,
                format!("position {:?} is out of range for {} records", position, len),
            ));
        }
        let record = create_for_slot(doc, &SlotRef::message(), record_type)?;
        Ok(Self {
            position,
            record,
            node: None,
            applied: None,
        })
    }

    /// Insert directly before the top-level record node `sibling`
    pub fn before<G: RecordGraph>(
        doc: &mut Document<G>,
        sibling: NodeId,
        record_type: &str,
    ) -> Result<Self, OperationError> {
        let index = top_level_index(doc, sibling)?;
        Self::new(doc, Position::At(index), record_type)
    }

    /// Insert directly after the top-level record node `sibling`
    pub fn after<G: RecordGraph>(
        doc: &mut Document<G>,
        sibling: NodeId,
        record_type: &str,
    ) -> Result<Self, OperationError> {
        let index = top_level_index(doc, sibling)?;
        Self::new(doc, Position::At(index + 1), record_type)
    }

    /// The record this operation inserts
    pub fn record(&self) -> RecordId {
        self.record
    }

    /// Node standing for the inserted record, once executed
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }
}

impl OperationInfo for InsertSiblingOperation {
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

impl<G: RecordGraph> ModelOperation<G> for InsertSiblingOperation {
    fn execute(&mut self, doc: &mut Document<G>) -> Result<(), OperationError> {
        if self.applied.is_some() {
            return Err(misuse(Self::NAME, "execute", OperationState::Executed));
        }
        let root = doc.root();
        let len = doc.tree().child_count(root);
        let index = self.position.resolve(len).ok_or_else(|| {
            OperationError::invalid_target(
                root,
                format!("position {:?} is out of range for {} records", self.position, len),
            )
        })?;
        let message = SlotRef::message();
        let record = self.record;
        let node = cached_node(doc, &mut self.node, record, &message)?;

        Transaction::run(doc, Self::NAME, |tx| {
            tx.connect(&message, record, index)?;
            tx.attach(root, node, index)
        })?;

        tracing::debug!("Inserted {} at message index {}", record, index);
        self.applied = Some(index);
        Ok(())
    }

    fn revoke(&mut self, doc: &mut Document<G>) -> Result<(), OperationError> {
        let (Some(_), Some(node)) = (self.applied, self.node) else {
            return Err(misuse(Self::NAME, "revoke", OperationState::Pending));
        };
        let root = doc.root();
        let record = self.record;

        Transaction::run(doc, Self::NAME, |tx| {
            tx.disconnect(&SlotRef::message(), record)?;
            tx.detach(root, node)
        })?;

        tracing::debug!("Revoked insert of {}", record);
        self.applied = None;
        Ok(())
    }
}

fn top_level_index<G: RecordGraph>(
    doc: &Document<G>,
    node: NodeId,
) -> Result<usize, OperationError> {
    let root = doc.root();
    match attached_kind(doc, node)? {
        NodeKind::Record { .. } if doc.tree().parent(node) == Some(root) => doc
            .tree()
            .index_of(root, node)
            .ok_or_else(|| OperationError::invalid_target(node, "not a child of the root")),
        other => Err(OperationError::invalid_target(
            node,
            format!("expected a top-level record node, found {}", other.name()),
        )),
    }
}

/// Remove a record from the message or from a single-valued slot
///
/// List elements are removed with
/// [`RemoveListItemOperation`](crate::operations::RemoveListItemOperation).
#[derive(Debug)]
pub struct RemoveRecordOperation {
    parent: NodeId,
    node: NodeId,
    slot: SlotRef,
    record: RecordId,
    /// Former graph and tree indices, set while executed
    applied: Option<(usize, usize)>,
}

impl RemoveRecordOperation {
    const NAME: &'static str = "remove_record";

    pub fn new<G: RecordGraph>(doc: &Document<G>, node: NodeId) -> Result<Self, OperationError> {
        let record = match attached_kind(doc, node)? {
            NodeKind::Record { record } => *record,
            other => {
                return Err(OperationError::invalid_target(
                    node,
                    format!("expected a record node, found {}", other.name()),
                ))
            }
        };
        let parent = doc
            .tree()
            .parent(node)
            .ok_or_else(|| OperationError::invalid_target(node, "node has no parent"))?;
        let slot = match attached_kind(doc, parent)? {
            NodeKind::Root | NodeKind::ParentProperty { .. } => doc.slot_of_node(parent)?,
            NodeKind::ListItem => {
                return Err(OperationError::invalid_target(
                    node,
                    "list elements are removed from their list",
                ))
            }
            other => {
                return Err(OperationError::invalid_target(
                    node,
                    format!("record node under a {} node", other.name()),
                ))
            }
        };
        Ok(Self {
            parent,
            node,
            slot,
            record,
            applied: None,
        })
    }

    pub fn record(&self) -> RecordId {
        self.record
    }
}

impl OperationInfo for RemoveRecordOperation {
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

impl<G: RecordGraph> ModelOperation<G> for RemoveRecordOperation {
    fn execute(&mut self, doc: &mut Document<G>) -> Result<(), OperationError> {
        if self.applied.is_some() {
            return Err(misuse(Self::NAME, "execute", OperationState::Executed));
        }
        let (parent, node, record) = (self.parent, self.node, self.record);
        let slot = &self.slot;

        let indices = Transaction::run(doc, Self::NAME, |tx| {
            let graph_index = tx.disconnect(slot, record)?;
            let tree_index = tx.detach(parent, node)?;
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
        let (parent, node, record) = (self.parent, self.node, self.record);
        let slot = &self.slot;

        Transaction::run(doc, Self::NAME, |tx| {
            tx.connect(slot, record, graph_index)?;
            tx.attach(parent, node, tree_index)
        })?;

        tracing::debug!("Restored {} to {} at index {}", record, self.slot, graph_index);
        self.applied = None;
        Ok(())
    }
}

/// Move a record to another index of the sequence it belongs to
///
/// Works on top-level records (message order) and on list elements (list
/// order). The target may be the record node or, for lists, its list item.
#[derive(Debug)]
pub struct MoveRecordOperation {
    parent: NodeId,
    node: NodeId,
    slot: SlotRef,
    record: RecordId,
    to: usize,
    /// Index before the move, set while executed
    applied: Option<usize>,
}

impl MoveRecordOperation {
    const NAME: &'static str = "move_record";

    pub fn new<G: RecordGraph>(
        doc: &Document<G>,
        node: NodeId,
        to: usize,
    ) -> Result<Self, OperationError> {
        let tree = doc.tree();
        let parent_kind = |n: NodeId| tree.parent(n).and_then(|p| tree.kind(p));
        let (moved, record) = match attached_kind(doc, node)? {
            NodeKind::Record { record } => match parent_kind(node) {
                Some(NodeKind::Root) => (node, *record),
                Some(NodeKind::ListItem) => match tree.parent(node) {
                    Some(item) => (item, *record),
                    None => {
                        return Err(OperationError::invalid_target(node, "node has no parent"))
                    }
                },
                _ => {
                    return Err(OperationError::invalid_target(
                        node,
                        "only top-level records and list elements can be moved",
                    ))
                }
            },
            NodeKind::ListItem => (node, record_under(doc, node)?.1),
            other => {
                return Err(OperationError::invalid_target(
                    node,
                    format!("cannot move a {} node", other.name()),
                ))
            }
        };
        let parent = tree
            .parent(moved)
            .ok_or_else(|| OperationError::invalid_target(moved, "node has no parent"))?;
        let len = tree.child_count(parent);
        if to >= len {
            return Err(OperationError::invalid_target(
                node,
                format!("index {} is out of range for {} elements", to, len),
            ));
        }
        Ok(Self {
            parent,
            node: moved,
            slot: doc.slot_of_node(parent)?,
            record,
            to,
            applied: None,
        })
    }
}

impl MoveRecordOperation {
    fn relocate<G: RecordGraph>(
        &self,
        doc: &mut Document<G>,
        to: usize,
    ) -> Result<usize, OperationError> {
        let (parent, node, record) = (self.parent, self.node, self.record);
        let slot = &self.slot;
        Transaction::run(doc, Self::NAME, |tx| {
            let from = tx.disconnect(slot, record)?;
            tx.connect(slot, record, to)?;
            tx.detach(parent, node)?;
            tx.attach(parent, node, to)?;
            Ok(from)
        })
    }
}

impl OperationInfo for MoveRecordOperation {
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

impl<G: RecordGraph> ModelOperation<G> for MoveRecordOperation {
    fn execute(&mut self, doc: &mut Document<G>) -> Result<(), OperationError> {
        if self.applied.is_some() {
            return Err(misuse(Self::NAME, "execute", OperationState::Executed));
        }
        let from = self.relocate(doc, self.to)?;
        tracing::debug!(
            "Moved {} in {} from {} to {}",
            self.record,
            self.slot,
            from,
            self.to
        );
        self.applied = Some(from);
        Ok(())
    }

    fn revoke(&mut self, doc: &mut Document<G>) -> Result<(), OperationError> {
        let Some(from) = self.applied else {
            return Err(misuse(Self::NAME, "revoke", OperationState::Pending));
        };
        self.relocate(doc, from)?;
        tracing::debug!("Moved {} in {} back to {}", self.record, self.slot, from);
        self.applied = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::Document;

    fn message(doc: &Document) -> Vec<RecordId> {
        doc.graph().children(&SlotRef::message()).unwrap().to_vec()
    }

    #[test]
    fn test_insert_before_and_after() {
        let mut doc = Document::ndef().unwrap();
        let mut first = InsertSiblingOperation::new(&mut doc, Position::End, "text").unwrap();
        first.execute(&mut doc).unwrap();
        let anchor = first.node().unwrap();

        let mut before = InsertSiblingOperation::before(&mut doc, anchor, "uri").unwrap();
        before.execute(&mut doc).unwrap();
        let mut after = InsertSiblingOperation::after(&mut doc, anchor, "mime").unwrap();
        after.execute(&mut doc).unwrap();

        assert_eq!(
            message(&doc),
            vec![before.record(), first.record(), after.record()]
        );
        doc.check_consistency().unwrap();
    }

    #[test]
    fn test_insert_rejects_inadmissible_type_before_mutation() {
        let mut doc = Document::ndef().unwrap();
        let records = doc.graph().len();
        let err =
            InsertSiblingOperation::new(&mut doc, Position::End, "gc_action").unwrap_err();
        assert!(matches!(err, OperationError::Schema(_)));
        assert_eq!(doc.graph().len(), records);

        let err = InsertSiblingOperation::new(&mut doc, Position::At(1), "text").unwrap_err();
        assert!(matches!(err, OperationError::InvalidTarget { .. }));
    }

    #[test]
    fn test_state_machine_misuse() {
        let mut doc = Document::ndef().unwrap();
        let mut op = InsertSiblingOperation::new(&mut doc, Position::End, "text").unwrap();

        let err = ModelOperation::revoke(&mut op, &mut doc).unwrap_err();
        assert!(matches!(
            err,
            OperationError::InvalidState { state: OperationState::Pending, .. }
        ));

        op.execute(&mut doc).unwrap();
        let err = op.execute(&mut doc).unwrap_err();
        assert!(matches!(
            err,
            OperationError::InvalidState { state: OperationState::Executed, .. }
        ));
        assert_eq!(message(&doc).len(), 1);
    }

    #[test]
    fn test_remove_single_slot_occupant() {
        let mut doc = Document::ndef().unwrap();
        let mut poster =
            InsertSiblingOperation::new(&mut doc, Position::End, "smart_poster").unwrap();
        poster.execute(&mut doc).unwrap();
        let poster_node = poster.node().unwrap();
        let title_slot = doc.slot_node(poster_node, "title").unwrap();
        let mut set =
            crate::operations::SetChildOperation::new(&mut doc, title_slot, "text").unwrap();
        set.execute(&mut doc).unwrap();
        let title_node = doc.tree().child(title_slot, 0).unwrap();

        let mut remove = RemoveRecordOperation::new(&doc, title_node).unwrap();
        remove.execute(&mut doc).unwrap();
        assert!(!doc.is_slot_occupied(title_slot).unwrap());
        assert_eq!(doc.graph().child_count(poster.record()), 0);
        doc.check_consistency().unwrap();

        remove.revoke(&mut doc).unwrap();
        assert!(doc.is_slot_occupied(title_slot).unwrap());
        doc.check_consistency().unwrap();
    }

    #[test]
    fn test_move_top_level_record() {
        let mut doc = Document::ndef().unwrap();
        let mut ops: Vec<InsertSiblingOperation> = ["text", "uri", "mime"]
            .iter()
            .map(|t| InsertSiblingOperation::new(&mut doc, Position::End, t).unwrap())
            .collect();
        for op in &mut ops {
            op.execute(&mut doc).unwrap();
        }
        let original = message(&doc);

        let mut mv = MoveRecordOperation::new(&doc, ops[0].node().unwrap(), 2).unwrap();
        mv.execute(&mut doc).unwrap();
        assert_eq!(message(&doc), vec![original[1], original[2], original[0]]);
        doc.check_consistency().unwrap();

        mv.revoke(&mut doc).unwrap();
        assert_eq!(message(&doc), original);
        doc.check_consistency().unwrap();

        assert!(MoveRecordOperation::new(&doc, ops[0].node().unwrap(), 3).is_err());
    }

    #[test]
    fn test_reexecute_reuses_node() {
        let mut doc = Document::ndef().unwrap();
        let mut op =
            InsertSiblingOperation::new(&mut doc, Position::End, "smart_poster").unwrap();
        op.execute(&mut doc).unwrap();
        let node = op.node().unwrap();
        let arena = doc.tree().arena_len();

        for _ in 0..3 {
            op.revoke(&mut doc).unwrap();
            assert!(!doc.tree().is_attached(node));
            op.execute(&mut doc).unwrap();
        }
        assert_eq!(op.node(), Some(node));
        assert_eq!(doc.tree().arena_len(), arena);
        assert_eq!(doc.tree().child(doc.root(), 0), Some(node));
        doc.check_consistency().unwrap();
    }

    #[test]
    fn test_nested_edit_survives_revoke_and_reexecute() {
        let mut doc = Document::ndef().unwrap();
        let mut poster =
            InsertSiblingOperation::new(&mut doc, Position::End, "smart_poster").unwrap();
        poster.execute(&mut doc).unwrap();
        let title_slot = doc.slot_node(poster.node().unwrap(), "title").unwrap();
        let mut title =
            crate::operations::SetChildOperation::new(&mut doc, title_slot, "text").unwrap();
        title.execute(&mut doc).unwrap();
        let edited = (doc.tree_snapshot(), doc.graph_snapshot().unwrap());

        title.revoke(&mut doc).unwrap();
        poster.revoke(&mut doc).unwrap();
        poster.execute(&mut doc).unwrap();
        title.execute(&mut doc).unwrap();

        assert!(doc.tree().is_attached(title_slot));
        assert_eq!((doc.tree_snapshot(), doc.graph_snapshot().unwrap()), edited);
        doc.check_consistency().unwrap();
    }
}
