//! Document
//!
//! A `Document` pairs a record graph with its presentation tree and the
//! schema both are shaped by. Outside of an in-flight operation the tree is
//! always the projection of the graph that [`NodeFactory::build_tree`] would
//! produce; [`Document::check_consistency`] verifies exactly that.
//!
//! The public surface is read-only. Mutation happens through the operations
//! in [`crate::operations`], which are the only callers of the crate-private
//! accessors below.

use crate::config::EditorConfig;
use crate::graph::{GraphError, GraphSnapshot, MemoryRecordGraph, RecordGraph, SlotRef};
use crate::models::{
    ListValue, NodeId, NodeKind, NodeTree, PropertyValue, RecordId, SchemaRegistry, SlotDef,
    TreeSnapshot,
};
use crate::services::{DocumentError, NodeFactory};
use std::sync::Arc;

pub struct Document<G: RecordGraph = MemoryRecordGraph> {
    schema: Arc<SchemaRegistry>,
    graph: G,
    tree: NodeTree,
}

impl Document<MemoryRecordGraph> {
    /// Empty document over an in-memory graph
    pub fn new(schema: Arc<SchemaRegistry>) -> Self {
        Self {
            graph: MemoryRecordGraph::new(schema.clone()),
            schema,
            tree: NodeTree::new(),
        }
    }

    /// Empty document using the built-in NDEF schema
    pub fn ndef() -> Result<Self, DocumentError> {
        Ok(Self::new(SchemaRegistry::ndef()?))
    }

    pub fn from_config(config: &EditorConfig) -> Result<Self, DocumentError> {
        Ok(Self::new(config.load_schema()?))
    }
}

impl<G: RecordGraph> Document<G> {
    /// Wrap an existing graph, projecting its message into a fresh tree
    pub fn from_graph(schema: Arc<SchemaRegistry>, graph: G) -> Result<Self, DocumentError> {
        let tree = NodeFactory::new(&schema, &graph).build_tree()?;
        tracing::debug!(
            "Loaded document with {} top-level records",
            tree.child_count(tree.root())
        );
        Ok(Self {
            schema,
            graph,
            tree,
        })
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    pub fn shared_schema(&self) -> Arc<SchemaRegistry> {
        self.schema.clone()
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// Give back the underlying graph, dropping the tree
    pub fn into_graph(self) -> G {
        self.graph
    }

    /// Allocate an unattached record
    ///
    /// The record only becomes part of the document when an operation places
    /// it, e.g. [`SetChildOperation::with_record`].
    ///
    /// [`SetChildOperation::with_record`]: crate::operations::SetChildOperation::with_record
    pub fn create_record(&mut self, record_type: &str) -> Result<RecordId, DocumentError> {
        Ok(self.graph.create_record(record_type)?)
    }

    /// Record node currently representing `record`, if it is attached
    pub fn record_node_of(&self, record: RecordId) -> Option<NodeId> {
        self.tree
            .descendants(self.tree.root())
            .into_iter()
            .find(|node| self.tree.kind(*node).and_then(NodeKind::record) == Some(record))
    }

    /// Child of `record_node` that holds `slot`
    pub fn slot_node(&self, record_node: NodeId, slot: &str) -> Option<NodeId> {
        self.tree
            .children(record_node)
            .iter()
            .copied()
            .find(|child| self.tree.kind(*child).and_then(NodeKind::slot) == Some(slot))
    }

    /// Graph address of the slot a slot node (or the root) stands for
    pub fn slot_of_node(&self, node: NodeId) -> Result<SlotRef, DocumentError> {
        let kind = self.kind(node)?;
        match kind {
            NodeKind::Root => Ok(SlotRef::message()),
            NodeKind::ParentProperty { slot }
            | NodeKind::PropertyList { slot }
            | NodeKind::Property { slot }
            | NodeKind::Content { slot } => {
                let owner = self
                    .tree
                    .parent_record(node)
                    .ok_or(DocumentError::Detached { node })?;
                Ok(SlotRef::record(owner, slot.clone()))
            }
            NodeKind::Record { .. } | NodeKind::ListItem => Err(DocumentError::wrong_node_kind(
                node,
                "slot",
                kind.name(),
            )),
        }
    }

    /// Schema definition of the slot a slot node (or the root) stands for
    pub fn slot_def(&self, node: NodeId) -> Result<&SlotDef, DocumentError> {
        let slot = self.slot_of_node(node)?;
        let owner_type = match slot.owner_record() {
            None => None,
            Some(owner) => Some(
                self.graph
                    .record_type(owner)
                    .ok_or_else(|| GraphError::unknown_record(owner))?,
            ),
        };
        Ok(self.schema.resolve_slot(owner_type, &slot.slot)?)
    }

    /// Index of the value list element a leaf stands for, `None` for a plain slot leaf
    pub fn element_index(&self, leaf: NodeId) -> Result<Option<usize>, DocumentError> {
        let Some(item) = self.tree.parent(leaf) else {
            return Err(DocumentError::Detached { node: leaf });
        };
        if self.kind(item)? != &NodeKind::ListItem {
            return Ok(None);
        }
        let list = self
            .tree
            .parent(item)
            .ok_or(DocumentError::Detached { node: item })?;
        Ok(self.tree.index_of(list, item))
    }

    /// Whether the slot a node stands for currently holds something
    ///
    /// Record slots are answered from the tree, value slots from the graph.
    pub fn is_slot_occupied(&self, node: NodeId) -> Result<bool, DocumentError> {
        match self.kind(node)? {
            NodeKind::Root | NodeKind::ParentProperty { .. } | NodeKind::PropertyList { .. } => {
                Ok(self.tree.has_children(node))
            }
            NodeKind::Property { .. } => Ok(self.property_of(node)?.is_some()),
            NodeKind::Content { .. } => Ok(self.content_of(node)?.is_some()),
            other => Err(DocumentError::wrong_node_kind(node, "slot", other.name())),
        }
    }

    /// Binary content behind a content node
    ///
    /// For an element of a binary list this is the element's bytes.
    pub fn content_of(&self, node: NodeId) -> Result<Option<&[u8]>, DocumentError> {
        let (record, slot) = self.value_slot(node, "content")?;
        match self.element_index(node)? {
            None => Ok(self.graph.content(record, slot)?),
            Some(index) => Ok(self.element(record, slot, index)?.and_then(ListValue::as_bytes)),
        }
    }

    /// Primitive value behind a property node
    ///
    /// For an element of a property list this is the element's value.
    pub fn property_of(&self, node: NodeId) -> Result<Option<&PropertyValue>, DocumentError> {
        let (record, slot) = self.value_slot(node, "property")?;
        match self.element_index(node)? {
            None => Ok(self.graph.property(record, slot)?),
            Some(index) => Ok(self
                .element(record, slot, index)?
                .and_then(ListValue::as_property)),
        }
    }

    pub fn tree_snapshot(&self) -> TreeSnapshot {
        self.tree.snapshot(self.tree.root())
    }

    pub fn graph_snapshot(&self) -> Result<GraphSnapshot, DocumentError> {
        Ok(GraphSnapshot::capture(&self.graph, &self.schema)?)
    }

    /// Verify that the tree is exactly the projection of the graph
    ///
    /// Reports the first divergence in pre-order, addressed by the child
    /// indices leading to it from the root.
    pub fn check_consistency(&self) -> Result<(), DocumentError> {
        let projected = NodeFactory::new(&self.schema, &self.graph).build_tree()?;
        let expected = projected.snapshot(projected.root());
        let actual = self.tree_snapshot();
        match first_divergence(&expected, &actual, &mut Vec::new()) {
            Some(err) => {
                tracing::warn!("Consistency check failed: {}", err);
                Err(err)
            }
            None => Ok(()),
        }
    }

    pub(crate) fn graph_mut(&mut self) -> &mut G {
        &mut self.graph
    }

    pub(crate) fn tree_mut(&mut self) -> &mut NodeTree {
        &mut self.tree
    }

    /// Allocate the detached node for `record` placed in `target`
    pub(crate) fn build_node(
        &mut self,
        record: RecordId,
        target: &SlotRef,
    ) -> Result<NodeId, DocumentError> {
        NodeFactory::new(&self.schema, &self.graph).build_for(&mut self.tree, record, target)
    }

    /// Allocate the detached list item for a new element of the value list `target`
    pub(crate) fn build_value_node(&mut self, target: &SlotRef) -> Result<NodeId, DocumentError> {
        NodeFactory::new(&self.schema, &self.graph).build_value_for(&mut self.tree, target)
    }

    fn kind(&self, node: NodeId) -> Result<&NodeKind, DocumentError> {
        self.tree.kind(node).ok_or(DocumentError::UnknownNode { node })
    }

    fn element(
        &self,
        record: RecordId,
        slot: &str,
        index: usize,
    ) -> Result<Option<&ListValue>, DocumentError> {
        Ok(self.graph.values(record, slot)?.get(index))
    }

    fn value_slot(
        &self,
        node: NodeId,
        expected: &'static str,
    ) -> Result<(RecordId, &str), DocumentError> {
        let kind = self.kind(node)?;
        let slot = match (kind, expected) {
            (NodeKind::Content { slot }, "content") | (NodeKind::Property { slot }, "property") => {
                slot.as_str()
            }
            _ => return Err(DocumentError::wrong_node_kind(node, expected, kind.name())),
        };
        let record = self
            .tree
            .parent_record(node)
            .ok_or(DocumentError::Detached { node })?;
        Ok((record, slot))
    }
}

fn describe(kind: &NodeKind) -> String {
    match kind {
        NodeKind::Record { record } => format!("record {}", record),
        other => match other.slot() {
            Some(slot) => format!("{}({})", other.name(), slot),
            None => other.name().to_string(),
        },
    }
}

fn render_path(path: &[usize]) -> String {
    let segments: Vec<String> = path.iter().map(usize::to_string).collect();
    format!("/{}", segments.join("/"))
}

fn first_divergence(
    expected: &TreeSnapshot,
    actual: &TreeSnapshot,
    path: &mut Vec<usize>,
) -> Option<DocumentError> {
    if expected.kind != actual.kind {
        return Some(DocumentError::inconsistent(
            render_path(path),
            describe(&expected.kind),
            describe(&actual.kind),
        ));
    }
    for (index, (e, a)) in expected.children.iter().zip(&actual.children).enumerate() {
        path.push(index);
        if let Some(err) = first_divergence(e, a, path) {
            return Some(err);
        }
        path.pop();
    }
    if expected.children.len() != actual.children.len() {
        return Some(DocumentError::inconsistent(
            render_path(path),
            format!("{} children", expected.children.len()),
            format!("{} children", actual.children.len()),
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Position;

    fn loaded() -> Document {
        let schema = SchemaRegistry::ndef().unwrap();
        let mut graph = MemoryRecordGraph::new(schema.clone());
        let poster = graph.create_record("smart_poster").unwrap();
        let title = graph.create_record("text").unwrap();
        let mime = graph.create_record("mime").unwrap();
        graph.connect(&SlotRef::message(), poster, 0).unwrap();
        graph.connect(&SlotRef::message(), mime, 1).unwrap();
        graph.connect(&SlotRef::record(poster, "title"), title, 0).unwrap();
        graph.set_content(mime, "content", Some(vec![0xCA, 0xFE])).unwrap();
        Document::from_graph(schema, graph).unwrap()
    }

    #[test]
    fn test_from_graph_is_consistent() {
        let doc = loaded();
        doc.check_consistency().unwrap();
        assert_eq!(
            doc.tree_snapshot().child_records(),
            doc.graph_snapshot().unwrap().message_records()
        );
    }

    #[test]
    fn test_slot_queries() {
        let doc = loaded();
        let poster = doc.tree().child(doc.root(), 0).unwrap();
        let title = doc.slot_node(poster, "title").unwrap();
        let uri = doc.slot_node(poster, "uri").unwrap();
        let poster_record = doc.tree().record_of(poster).unwrap();

        assert_eq!(
            doc.slot_of_node(title).unwrap(),
            SlotRef::record(poster_record, "title")
        );
        assert_eq!(doc.slot_of_node(doc.root()).unwrap(), SlotRef::message());
        assert!(doc.is_slot_occupied(title).unwrap());
        assert!(!doc.is_slot_occupied(uri).unwrap());
        assert!(matches!(
            doc.slot_of_node(poster),
            Err(DocumentError::WrongNodeKind { .. })
        ));
    }

    #[test]
    fn test_content_and_property_reads() {
        let doc = loaded();
        let mime = doc.tree().child(doc.root(), 1).unwrap();
        let content = doc.slot_node(mime, "content").unwrap();
        let content_type = doc.slot_node(mime, "content_type").unwrap();

        assert_eq!(doc.content_of(content).unwrap(), Some(&[0xCA, 0xFE][..]));
        assert_eq!(doc.property_of(content_type).unwrap(), None);
        assert!(!doc.is_slot_occupied(content_type).unwrap());
        assert!(matches!(
            doc.content_of(content_type),
            Err(DocumentError::WrongNodeKind { .. })
        ));
    }

    #[test]
    fn test_value_list_element_reads() {
        let schema = SchemaRegistry::ndef().unwrap();
        let mut graph = MemoryRecordGraph::new(schema.clone());
        let carrier = graph.create_record("alternative_carrier").unwrap();
        graph.connect(&SlotRef::message(), carrier, 0).unwrap();
        for (i, reference) in ["aux-0", "aux-1"].into_iter().enumerate() {
            let value = ListValue::Property(PropertyValue::from(reference));
            graph
                .insert_value(carrier, "auxiliary_data_references", i, value)
                .unwrap();
        }
        let doc = Document::from_graph(schema, graph).unwrap();
        doc.check_consistency().unwrap();

        let node = doc.tree().child(doc.root(), 0).unwrap();
        let list = doc.slot_node(node, "auxiliary_data_references").unwrap();
        assert_eq!(doc.slot_def(list).unwrap().kind, crate::models::SlotKind::PropertyList);
        assert!(doc.is_slot_occupied(list).unwrap());

        let leaf = doc.tree().child(doc.tree().child(list, 1).unwrap(), 0).unwrap();
        assert_eq!(doc.element_index(leaf).unwrap(), Some(1));
        assert_eq!(
            doc.property_of(leaf).unwrap(),
            Some(&PropertyValue::from("aux-1"))
        );
        assert!(doc.is_slot_occupied(leaf).unwrap());

        let plain = doc.slot_node(node, "carrier_power_state").unwrap();
        assert_eq!(doc.element_index(plain).unwrap(), None);
        assert_eq!(doc.property_of(plain).unwrap(), None);
    }

    #[test]
    fn test_record_node_lookup() {
        let doc = loaded();
        let poster = doc.tree().child(doc.root(), 0).unwrap();
        let record = doc.tree().record_of(poster).unwrap();
        assert_eq!(doc.record_node_of(record), Some(poster));
        assert_eq!(doc.record_node_of(RecordId::new(42)), None);
    }

    #[test]
    fn test_check_consistency_reports_divergence() {
        let mut doc = loaded();
        let root = doc.root();
        let stray = doc.tree_mut().alloc(NodeKind::ListItem);
        doc.tree_mut().add(root, stray, Position::End).unwrap();

        let err = doc.check_consistency().unwrap_err();
        match err {
            DocumentError::Inconsistent { path, expected, actual } => {
                assert_eq!(path, "/");
                assert_eq!(expected, "2 children");
                assert_eq!(actual, "3 children");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_check_consistency_detects_graph_ahead_of_tree() {
        let mut doc = loaded();
        let extra = doc.graph_mut().create_record("uri").unwrap();
        doc.graph_mut().connect(&SlotRef::message(), extra, 0).unwrap();

        let err = doc.check_consistency().unwrap_err();
        assert!(matches!(err, DocumentError::Inconsistent { .. }));
    }
}
