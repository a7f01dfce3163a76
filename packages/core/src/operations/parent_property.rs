//! Single-valued slot set/replace

use crate::graph::{RecordGraph, SlotRef};
use crate::models::{NodeId, NodeKind, RecordId};
use crate::operations::transaction::Transaction;
use crate::operations::{
    attached_kind, cached_node, check_detached_record, create_for_slot, misuse, record_under,
    ModelOperation, OperationError, OperationInfo, OperationState,
};
use crate::services::Document;

#[derive(Debug, Clone, Copy)]
struct Applied {
    node: NodeId,
    /// Occupant evicted by execute, restored by revoke
    previous: Option<(RecordId, NodeId)>,
}

/// Put a record into a single-valued slot, evicting the current occupant
///
/// The target is the slot's parent-property node. The record is either
/// created fresh ([`SetChildOperation::new`]) or supplied by the caller, in
/// which case it must exist and be unattached ([`SetChildOperation::with_record`]).
#[derive(Debug)]
pub struct SetChildOperation {
    holder: NodeId,
    slot: SlotRef,
    record: RecordId,
    /// Node built on the first execute, reattached on later ones
    node: Option<NodeId>,
    applied: Option<Applied>,
}

impl SetChildOperation {
    const NAME: &'static str = "set_child";

    pub fn new<G: RecordGraph>(
        doc: &mut Document<G>,
        holder: NodeId,
        record_type: &str,
    ) -> Result<Self, OperationError> {
        let slot = holder_slot(doc, holder)?;
        let record = create_for_slot(doc, &slot, record_type)?;
        Ok(Self {
            holder,
            slot,
            record,
            node: None,
            applied: None,
        })
    }

    pub fn with_record<G: RecordGraph>(
        doc: &Document<G>,
        holder: NodeId,
        record: RecordId,
    ) -> Result<Self, OperationError> {
        let slot = holder_slot(doc, holder)?;
        check_detached_record(doc, &slot, record)?;
        Ok(Self {
            holder,
            slot,
            record,
            node: None,
            applied: None,
        })
    }

    pub fn record(&self) -> RecordId {
        self.record
    }

    /// Record evicted by the last execute, if any
    pub fn previous(&self) -> Option<RecordId> {
        self.applied
            .and_then(|applied| applied.previous)
            .map(|(record, _)| record)
    }
}

fn holder_slot<G: RecordGraph>(
    doc: &Document<G>,
    holder: NodeId,
) -> Result<SlotRef, OperationError> {
    match attached_kind(doc, holder)? {
        NodeKind::ParentProperty { .. } => Ok(doc.slot_of_node(holder)?),
        other => Err(OperationError::invalid_target(
            holder,
            format!("expected a parent property node, found {}", other.name()),
        )),
    }
}

impl OperationInfo for SetChildOperation {
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

impl<G: RecordGraph> ModelOperation<G> for SetChildOperation {
    fn execute(&mut self, doc: &mut Document<G>) -> Result<(), OperationError> {
        if self.applied.is_some() {
            return Err(misuse(Self::NAME, "execute", OperationState::Executed));
        }
        let holder = self.holder;
        let previous = if doc.tree().has_children(holder) {
            Some(record_under(doc, holder)?)
        } else {
            None
        };
        if previous.is_some_and(|(_, record)| record == self.record) {
            return Err(OperationError::invalid_target(
                holder,
                format!("{} already occupies {}", self.record, self.slot),
            ));
        }
        let record = self.record;
        let node = cached_node(doc, &mut self.node, record, &self.slot)?;
        let slot = &self.slot;

        Transaction::run(doc, Self::NAME, |tx| {
            if let Some((previous_node, previous_record)) = previous {
                tx.disconnect(slot, previous_record)?;
                tx.detach(holder, previous_node)?;
            }
            tx.connect(slot, record, 0)?;
            tx.attach(holder, node, 0)
        })?;

        let previous = previous.map(|(node, record)| (record, node));
        match previous {
            Some((evicted, _)) => {
                tracing::debug!("Replaced {} with {} in {}", evicted, record, self.slot)
            }
            None => tracing::debug!("Set {} into {}", record, self.slot),
        }
        self.applied = Some(Applied { node, previous });
        Ok(())
    }

    fn revoke(&mut self, doc: &mut Document<G>) -> Result<(), OperationError> {
        let Some(applied) = self.applied else {
            return Err(misuse(Self::NAME, "revoke", OperationState::Pending));
        };
        let (holder, record) = (self.holder, self.record);
        let slot = &self.slot;

        Transaction::run(doc, Self::NAME, |tx| {
            tx.disconnect(slot, record)?;
            tx.detach(holder, applied.node)?;
            if let Some((previous_record, previous_node)) = applied.previous {
                tx.connect(slot, previous_record, 0)?;
                tx.attach(holder, previous_node, 0)?;
            }
            Ok(())
        })?;

        tracing::debug!("Revoked set of {} into {}", record, self.slot);
        self.applied = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Position;
    use crate::operations::InsertSiblingOperation;

    fn poster(doc: &mut Document) -> NodeId {
        let mut op = InsertSiblingOperation::new(doc, Position::End, "smart_poster").unwrap();
        op.execute(doc).unwrap();
        op.node().unwrap()
    }

    #[test]
    fn test_set_into_vacant_slot() {
        let mut doc = Document::ndef().unwrap();
        let poster = poster(&mut doc);
        let uri_slot = doc.slot_node(poster, "uri").unwrap();

        let mut op = SetChildOperation::new(&mut doc, uri_slot, "uri").unwrap();
        op.execute(&mut doc).unwrap();
        assert_eq!(op.previous(), None);
        assert_eq!(
            doc.tree().record_of(doc.tree().child(uri_slot, 0).unwrap()),
            Some(op.record())
        );
        doc.check_consistency().unwrap();

        op.revoke(&mut doc).unwrap();
        assert!(!doc.tree().has_children(uri_slot));
        doc.check_consistency().unwrap();
    }

    #[test]
    fn test_rejects_wrong_type_and_wrong_target() {
        let mut doc = Document::ndef().unwrap();
        let poster = poster(&mut doc);
        let title_slot = doc.slot_node(poster, "title").unwrap();

        let err = SetChildOperation::new(&mut doc, title_slot, "uri").unwrap_err();
        assert!(matches!(err, OperationError::Schema(_)));

        let err = SetChildOperation::new(&mut doc, poster, "text").unwrap_err();
        assert!(matches!(err, OperationError::InvalidTarget { .. }));
    }

    #[test]
    fn test_with_record_requires_detached_record() {
        let mut doc = Document::ndef().unwrap();
        let poster = poster(&mut doc);
        let title_slot = doc.slot_node(poster, "title").unwrap();
        let poster_record = doc.tree().record_of(poster).unwrap();

        // the poster itself is connected to the message
        let err = SetChildOperation::with_record(&doc, title_slot, poster_record).unwrap_err();
        assert!(matches!(err, OperationError::Graph(_)));

        let text = doc.graph_mut().create_record("text").unwrap();
        let mut op = SetChildOperation::with_record(&doc, title_slot, text).unwrap();
        op.execute(&mut doc).unwrap();
        assert_eq!(
            doc.graph().owner_of(text),
            Some(&SlotRef::record(poster_record, "title"))
        );
    }

    #[test]
    fn test_replace_cycle_reuses_both_nodes() {
        let mut doc = Document::ndef().unwrap();
        let poster = poster(&mut doc);
        let title_slot = doc.slot_node(poster, "title").unwrap();
        let mut first = SetChildOperation::new(&mut doc, title_slot, "text").unwrap();
        first.execute(&mut doc).unwrap();
        let first_node = doc.tree().child(title_slot, 0).unwrap();

        let mut second = SetChildOperation::new(&mut doc, title_slot, "text").unwrap();
        second.execute(&mut doc).unwrap();
        let second_node = doc.tree().child(title_slot, 0).unwrap();
        let arena = doc.tree().arena_len();

        second.revoke(&mut doc).unwrap();
        assert_eq!(doc.tree().child(title_slot, 0), Some(first_node));
        second.execute(&mut doc).unwrap();
        assert_eq!(doc.tree().child(title_slot, 0), Some(second_node));
        assert_eq!(second.previous(), Some(first.record()));
        assert_eq!(doc.tree().arena_len(), arena);
        doc.check_consistency().unwrap();
    }
}
