//! Node Factory
//!
//! Shapes presentation nodes for records. The factory reads the record graph
//! and the schema but never mutates the graph; it only allocates detached
//! nodes in a [`NodeTree`] that the caller then attaches.
//!
//! A record node always gets one child per schema slot, in schema order:
//!
//! | Slot kind       | Node                                                          |
//! |-----------------|---------------------------------------------------------------|
//! | `record`        | `ParentProperty` holding the occupant's record node, if any   |
//! | `record_list`   | `PropertyList` with one `ListItem` per connected record       |
//! | `property`      | `Property` leaf                                               |
//! | `binary`        | `Content` leaf                                                |
//! | `property_list` | `PropertyList`, one `ListItem` per element, `Property` leaves |
//! | `binary_list`   | `PropertyList`, one `ListItem` per element, `Content` leaves  |

use crate::graph::{RecordGraph, SlotOwner, SlotRef};
use crate::models::{
    NodeId, NodeKind, NodeTree, Position, RecordId, SchemaRegistry, SlotDef, SlotKind,
};
use crate::services::DocumentError;

/// Builds node subtrees for records of a graph
pub struct NodeFactory<'a, G: RecordGraph + ?Sized> {
    schema: &'a SchemaRegistry,
    graph: &'a G,
}

impl<'a, G: RecordGraph + ?Sized> NodeFactory<'a, G> {
    pub fn new(schema: &'a SchemaRegistry, graph: &'a G) -> Self {
        Self { schema, graph }
    }

    /// Build the detached record node subtree for `record`
    pub fn build_record(
        &self,
        tree: &mut NodeTree,
        record: RecordId,
    ) -> Result<NodeId, DocumentError> {
        let record_type = self
            .graph
            .record_type(record)
            .ok_or_else(|| crate::graph::GraphError::unknown_record(record))?;
        let def = self.schema.record_type(record_type)?;

        let node = tree.alloc(NodeKind::Record { record });
        for slot in &def.slots {
            let slot_node = match slot.kind {
                SlotKind::Record => {
                    let holder = tree.alloc(NodeKind::ParentProperty {
                        slot: slot.name.clone(),
                    });
                    for child in self.graph.children(&SlotRef::record(record, &slot.name))? {
                        let child_node = self.build_record(tree, *child)?;
                        tree.add(holder, child_node, Position::End)?;
                    }
                    holder
                }
                SlotKind::RecordList => {
                    let list = tree.alloc(NodeKind::PropertyList {
                        slot: slot.name.clone(),
                    });
                    for child in self.graph.children(&SlotRef::record(record, &slot.name))? {
                        let item = self.build_list_item(tree, *child)?;
                        tree.add(list, item, Position::End)?;
                    }
                    list
                }
                SlotKind::Property => tree.alloc(NodeKind::Property {
                    slot: slot.name.clone(),
                }),
                SlotKind::Binary => tree.alloc(NodeKind::Content {
                    slot: slot.name.clone(),
                }),
                SlotKind::PropertyList | SlotKind::BinaryList => {
                    let list = tree.alloc(NodeKind::PropertyList {
                        slot: slot.name.clone(),
                    });
                    for _ in self.graph.values(record, &slot.name)? {
                        let item = Self::build_value_item(tree, slot)?;
                        tree.add(list, item, Position::End)?;
                    }
                    list
                }
            };
            tree.add(node, slot_node, Position::End)?;
        }
        Ok(node)
    }

    /// Build the node that represents `record` once placed in `target`
    ///
    /// Records entering a list slot are wrapped in a list item; records
    /// entering the message or a single-valued slot are returned bare. The
    /// placement is validated against the schema first.
    pub fn build_for(
        &self,
        tree: &mut NodeTree,
        record: RecordId,
        target: &SlotRef,
    ) -> Result<NodeId, DocumentError> {
        let child_type = self
            .graph
            .record_type(record)
            .ok_or_else(|| crate::graph::GraphError::unknown_record(record))?;
        let owner_type = match target.owner {
            SlotOwner::Message => None,
            SlotOwner::Record(owner) => Some(
                self.graph
                    .record_type(owner)
                    .ok_or_else(|| crate::graph::GraphError::unknown_record(owner))?,
            ),
        };
        let slot = self.schema.validate(owner_type, &target.slot, child_type)?;

        match target.owner {
            SlotOwner::Record(_) if slot.is_list() => self.build_list_item(tree, record),
            _ => self.build_record(tree, record),
        }
    }

    /// Build the detached list item for a new element of the value list `target`
    pub fn build_value_for(
        &self,
        tree: &mut NodeTree,
        target: &SlotRef,
    ) -> Result<NodeId, DocumentError> {
        let owner = target
            .owner_record()
            .ok_or_else(|| crate::models::SchemaError::unknown_slot("message", &target.slot))?;
        let owner_type = self
            .graph
            .record_type(owner)
            .ok_or_else(|| crate::graph::GraphError::unknown_record(owner))?;
        let slot = self.schema.slot(owner_type, &target.slot)?;
        if slot.kind.element_kind().is_none() {
            return Err(crate::graph::GraphError::WrongSlotKind {
                slot: target.clone(),
                kind: slot.kind,
            }
            .into());
        }
        Self::build_value_item(tree, slot)
    }

    /// Project every record reachable from the message into a fresh tree
    pub fn build_tree(&self) -> Result<NodeTree, DocumentError> {
        let mut tree = NodeTree::new();
        let root = tree.root();
        for record in self.graph.children(&SlotRef::message())? {
            let node = self.build_record(&mut tree, *record)?;
            tree.add(root, node, Position::End)?;
        }
        Ok(tree)
    }

    fn build_list_item(
        &self,
        tree: &mut NodeTree,
        record: RecordId,
    ) -> Result<NodeId, DocumentError> {
        let item = tree.alloc(NodeKind::ListItem);
        let node = self.build_record(tree, record)?;
        tree.add(item, node, Position::End)?;
        Ok(item)
    }

    fn build_value_item(tree: &mut NodeTree, slot: &SlotDef) -> Result<NodeId, DocumentError> {
        let slot_name = slot.name.clone();
        let leaf = match slot.kind {
            SlotKind::BinaryList => NodeKind::Content { slot: slot_name },
            _ => NodeKind::Property { slot: slot_name },
        };
        let item = tree.alloc(NodeKind::ListItem);
        let leaf = tree.alloc(leaf);
        tree.add(item, leaf, Position::End)?;
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryRecordGraph;
    use crate::models::{ListValue, PropertyValue};

    fn setup() -> MemoryRecordGraph {
        MemoryRecordGraph::new(SchemaRegistry::ndef().unwrap())
    }

    fn kinds(tree: &NodeTree, node: NodeId) -> Vec<&'static str> {
        tree.children(node)
            .iter()
            .map(|c| tree.kind(*c).map(NodeKind::name).unwrap_or("?"))
            .collect()
    }

    #[test]
    fn test_record_node_has_one_child_per_slot() {
        let mut graph = setup();
        let control = graph.create_record("generic_control").unwrap();
        let schema = graph.schema().clone();

        let mut tree = NodeTree::new();
        let node = NodeFactory::new(&schema, &graph)
            .build_record(&mut tree, control)
            .unwrap();

        assert_eq!(
            kinds(&tree, node),
            vec!["property", "parent_property", "parent_property", "parent_property"]
        );
        assert!(!tree.is_attached(node));
    }

    #[test]
    fn test_nested_records_are_projected() {
        let mut graph = setup();
        let control = graph.create_record("generic_control").unwrap();
        let data = graph.create_record("gc_data").unwrap();
        let text = graph.create_record("text").unwrap();
        graph.connect(&SlotRef::message(), control, 0).unwrap();
        graph.connect(&SlotRef::record(control, "data"), data, 0).unwrap();
        graph.connect(&SlotRef::record(data, "records"), text, 0).unwrap();
        graph
            .set_property(text, "text", Some(PropertyValue::from("hello")))
            .unwrap();
        let schema = graph.schema().clone();

        let tree = NodeFactory::new(&schema, &graph).build_tree().unwrap();
        let root = tree.root();
        let control_node = tree.child(root, 0).unwrap();
        let data_slot = tree.child(control_node, 3).unwrap();
        let data_node = tree.child(data_slot, 0).unwrap();
        let list = tree.child(data_node, 0).unwrap();
        let item = tree.child(list, 0).unwrap();
        let text_node = tree.child(item, 0).unwrap();

        assert_eq!(tree.kind(list).map(NodeKind::name), Some("property_list"));
        assert_eq!(tree.kind(item), Some(&NodeKind::ListItem));
        assert_eq!(tree.record_of(text_node), Some(text));
        assert_eq!(tree.record_level(text_node), Some(3));
    }

    #[test]
    fn test_build_for_wraps_list_slots_only() {
        let mut graph = setup();
        let data = graph.create_record("gc_data").unwrap();
        let poster = graph.create_record("smart_poster").unwrap();
        let text = graph.create_record("text").unwrap();
        let schema = graph.schema().clone();
        let factory = NodeFactory::new(&schema, &graph);
        let mut tree = NodeTree::new();

        let item = factory
            .build_for(&mut tree, text, &SlotRef::record(data, "records"))
            .unwrap();
        assert_eq!(tree.kind(item), Some(&NodeKind::ListItem));

        let bare = factory
            .build_for(&mut tree, text, &SlotRef::record(poster, "title"))
            .unwrap();
        assert_eq!(tree.kind(bare), Some(&NodeKind::Record { record: text }));

        let top = factory
            .build_for(&mut tree, poster, &SlotRef::message())
            .unwrap();
        assert_eq!(tree.kind(top), Some(&NodeKind::Record { record: poster }));
    }

    #[test]
    fn test_build_for_rejects_inadmissible_placement() {
        let mut graph = setup();
        let poster = graph.create_record("smart_poster").unwrap();
        let uri = graph.create_record("uri").unwrap();
        let schema = graph.schema().clone();
        let mut tree = NodeTree::new();
        let before = tree.arena_len();

        let err = NodeFactory::new(&schema, &graph)
            .build_for(&mut tree, uri, &SlotRef::record(poster, "title"))
            .unwrap_err();
        assert!(matches!(err, DocumentError::Schema(_)));
        assert_eq!(tree.arena_len(), before);
    }

    #[test]
    fn test_value_lists_project_one_item_per_element() {
        let mut graph = setup();
        let signature = graph.create_record("signature").unwrap();
        graph.connect(&SlotRef::message(), signature, 0).unwrap();
        for cert in [vec![1], vec![2]] {
            let at = graph.values(signature, "certificates").unwrap().len();
            graph
                .insert_value(signature, "certificates", at, ListValue::Binary(cert))
                .unwrap();
        }
        let schema = graph.schema().clone();

        let tree = NodeFactory::new(&schema, &graph).build_tree().unwrap();
        let node = tree.child(tree.root(), 0).unwrap();
        let list = tree.child(node, 4).unwrap();
        assert_eq!(
            tree.kind(list),
            Some(&NodeKind::PropertyList {
                slot: "certificates".to_string()
            })
        );
        assert_eq!(kinds(&tree, list), vec!["list_item", "list_item"]);
        let leaf = tree.child(tree.child(list, 1).unwrap(), 0).unwrap();
        assert_eq!(tree.kind(leaf).map(NodeKind::name), Some("content"));
        assert_eq!(tree.parent_record(leaf), Some(signature));
    }

    #[test]
    fn test_build_value_for_checks_slot_kind() {
        let mut graph = setup();
        let carrier = graph.create_record("alternative_carrier").unwrap();
        let schema = graph.schema().clone();
        let factory = NodeFactory::new(&schema, &graph);
        let mut tree = NodeTree::new();

        let item = factory
            .build_value_for(
                &mut tree,
                &SlotRef::record(carrier, "auxiliary_data_references"),
            )
            .unwrap();
        let leaf = tree.child(item, 0).unwrap();
        assert_eq!(tree.kind(leaf).map(NodeKind::name), Some("property"));

        let err = factory
            .build_value_for(&mut tree, &SlotRef::record(carrier, "carrier_power_state"))
            .unwrap_err();
        assert!(matches!(err, DocumentError::Graph(_)));
    }
}
