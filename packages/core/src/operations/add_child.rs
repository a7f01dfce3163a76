//! "Add record" resolution
//!
//! Maps a request to add a record of some type "under" an arbitrary node to
//! the concrete operation that performs it.

use crate::graph::RecordGraph;
use crate::models::{NodeId, NodeKind, Position};
use crate::operations::{
    target_kind, InsertListItemOperation, InsertSiblingOperation, ModelOperation, OperationError,
    SetChildOperation,
};
use crate::services::Document;

/// Build the operation that adds a `record_type` record under `node`
///
/// | Target           | Operation                                               |
/// |------------------|---------------------------------------------------------|
/// | root             | append to the message                                   |
/// | record           | first vacant single slot, else first list slot, that admits the type |
/// | parent property  | set (or replace) the slot's record                      |
/// | property list    | append to the list                                      |
/// | list item        | insert into the same list right after the item          |
///
/// Leaf nodes and value lists (and their items) are rejected; elements of a
/// value list are added with
/// [`InsertValueOperation`](crate::operations::InsertValueOperation).
pub fn add_child<G: RecordGraph>(
    doc: &mut Document<G>,
    node: NodeId,
    record_type: &str,
) -> Result<Box<dyn ModelOperation<G>>, OperationError> {
    match target_kind(doc, node)?.clone() {
        NodeKind::Root => Ok(Box::new(InsertSiblingOperation::new(
            doc,
            Position::End,
            record_type,
        )?)),
        NodeKind::Record { record } => {
            let owner_type = doc
                .graph()
                .record_type(record)
                .ok_or_else(|| crate::graph::GraphError::unknown_record(record))?
                .to_string();
            let schema = doc.schema();
            let admits =
                |slot: &str| schema.is_admissible(Some(&owner_type), slot, record_type);

            let mut list_slot = None;
            let mut single_slot = None;
            for child in doc.tree().children(node) {
                match doc.tree().kind(*child) {
                    Some(NodeKind::ParentProperty { slot })
                        if single_slot.is_none()
                            && !doc.tree().has_children(*child)
                            && admits(slot) =>
                    {
                        single_slot = Some(*child);
                    }
                    Some(NodeKind::PropertyList { slot })
                        if list_slot.is_none() && admits(slot) =>
                    {
                        list_slot = Some(*child);
                    }
                    _ => {}
                }
            }

            match (single_slot, list_slot) {
                (Some(holder), _) => {
                    Ok(Box::new(SetChildOperation::new(doc, holder, record_type)?))
                }
                (None, Some(list)) => Ok(Box::new(InsertListItemOperation::new(
                    doc,
                    list,
                    Position::End,
                    record_type,
                )?)),
                (None, None) => Err(OperationError::invalid_target(
                    node,
                    format!("no vacant slot of '{}' admits '{}'", owner_type, record_type),
                )),
            }
        }
        NodeKind::ParentProperty { .. } => {
            Ok(Box::new(SetChildOperation::new(doc, node, record_type)?))
        }
        NodeKind::PropertyList { .. } => {
            record_list(doc, node)?;
            Ok(Box::new(InsertListItemOperation::new(
                doc,
                node,
                Position::End,
                record_type,
            )?))
        }
        NodeKind::ListItem => {
            let list = doc
                .tree()
                .parent(node)
                .ok_or_else(|| OperationError::invalid_target(node, "list item has no parent"))?;
            record_list(doc, list)?;
            let index = doc
                .tree()
                .index_of(list, node)
                .ok_or_else(|| OperationError::invalid_target(node, "list item has no parent"))?;
            Ok(Box::new(InsertListItemOperation::new(
                doc,
                list,
                Position::At(index + 1),
                record_type,
            )?))
        }
        leaf @ (NodeKind::Property { .. } | NodeKind::Content { .. }) => {
            Err(OperationError::invalid_target(
                node,
                format!("cannot add records under a {} node", leaf.name()),
            ))
        }
    }
}

/// Reject property lists that hold values rather than records
fn record_list<G: RecordGraph>(doc: &Document<G>, list: NodeId) -> Result<(), OperationError> {
    if doc.slot_def(list)?.kind.holds_records() {
        Ok(())
    } else {
        Err(OperationError::invalid_target(
            list,
            "value lists take values, not records",
        ))
    }
}
