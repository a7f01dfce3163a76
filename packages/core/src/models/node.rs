//! Presentation Tree
//!
//! The node tree mirrors the record graph in a uniform shape that a generic
//! tree viewer can walk. Nodes live in an arena (`NodeTree`) and refer to each
//! other through `NodeId` handles:
//!
//! - **Ownership**: the arena owns every node; parent links are plain handles
//! - **Detached nodes**: a node removed from the tree stays in the arena so an
//!   operation can put it back on revoke, but it is unreachable from the root
//! - **Derived facts**: depth, index, enclosing record and record branch index
//!   are computed by walking parent links, O(depth)
//!
//! # Node Kinds
//!
//! ```text
//! Root                                  (the NDEF message)
//! └── Record(record#1: generic_control)
//!     ├── Property(configuration_byte)
//!     ├── ParentProperty(target)        (0 or 1 child)
//!     │   └── Record(record#2: gc_target)
//!     ├── ParentProperty(action)
//!     └── ParentProperty(data)
//!         └── Record(record#3: gc_data)
//!             └── PropertyList(records)
//!                 └── ListItem
//!                     └── Record(record#4: text)
//! ```
//!
//! Structural mutation is crate-private: only the node factory and the
//! operations touch child collections.

use crate::models::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Handle of a node inside a [`NodeTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Node variants of the presentation tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// Tree root, parent of the top-level record nodes
    Root,
    /// Wraps one record of the record graph
    Record { record: RecordId },
    /// Single-valued record slot
    ParentProperty { slot: String },
    /// Ordered, repeatable record slot
    PropertyList { slot: String },
    /// One element of a property list
    ListItem,
    /// Primitive property leaf
    Property { slot: String },
    /// Binary content leaf
    Content { slot: String },
}

impl NodeKind {
    /// Maximum number of children, `None` when unbounded
    pub fn max_children(&self) -> Option<usize> {
        match self {
            NodeKind::Root | NodeKind::Record { .. } | NodeKind::PropertyList { .. } => None,
            NodeKind::ParentProperty { .. } | NodeKind::ListItem => Some(1),
            NodeKind::Property { .. } | NodeKind::Content { .. } => Some(0),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.max_children() == Some(0)
    }

    /// Slot name for slot-backed nodes
    pub fn slot(&self) -> Option<&str> {
        match self {
            NodeKind::ParentProperty { slot }
            | NodeKind::PropertyList { slot }
            | NodeKind::Property { slot }
            | NodeKind::Content { slot } => Some(slot),
            NodeKind::Root | NodeKind::Record { .. } | NodeKind::ListItem => None,
        }
    }

    pub fn record(&self) -> Option<RecordId> {
        match self {
            NodeKind::Record { record } => Some(*record),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Record { .. } => "record",
            NodeKind::ParentProperty { .. } => "parent_property",
            NodeKind::PropertyList { .. } => "property_list",
            NodeKind::ListItem => "list_item",
            NodeKind::Property { .. } => "property",
            NodeKind::Content { .. } => "content",
        }
    }
}

/// Insertion position within a child collection
///
/// `End` appends and is equivalent to `At(len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Position {
    At(usize),
    #[default]
    End,
}

impl Position {
    /// Concrete index for a collection of `len` elements, `None` if out of range
    pub fn resolve(self, len: usize) -> Option<usize> {
        match self {
            Position::At(index) if index <= len => Some(index),
            Position::At(_) => None,
            Position::End => Some(len),
        }
    }
}

impl From<usize> for Position {
    fn from(index: usize) -> Self {
        Position::At(index)
    }
}

/// Structural errors raised by tree mutation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Node {node} does not exist")]
    UnknownNode { node: NodeId },

    #[error("Node {node} is already attached to {parent}")]
    AlreadyAttached { node: NodeId, parent: NodeId },

    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("Position {position:?} is out of range for {parent} with {len} children")]
    PositionOutOfRange {
        parent: NodeId,
        position: Position,
        len: usize,
    },

    #[error("Node {parent} ({kind}) cannot hold more children")]
    CapacityExceeded { parent: NodeId, kind: &'static str },

    #[error("The root node cannot be attached elsewhere")]
    RootNotMovable,
}

#[derive(Debug, Clone)]
struct NodeEntry {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed presentation tree
#[derive(Debug, Clone)]
pub struct NodeTree {
    nodes: Vec<NodeEntry>,
    root: NodeId,
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTree {
    /// Create a tree holding only the root node
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeEntry {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes in the arena, attached or not
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        node.0 < self.nodes.len()
    }

    pub fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.entry(node).map(|e| &e.kind)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.entry(node).and_then(|e| e.parent)
    }

    pub fn has_parent(&self, node: NodeId) -> bool {
        self.parent(node).is_some()
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.entry(node).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    pub fn child(&self, node: NodeId, index: usize) -> Option<NodeId> {
        self.children(node).get(index).copied()
    }

    pub fn child_count(&self, node: NodeId) -> usize {
        self.children(node).len()
    }

    pub fn has_children(&self, node: NodeId) -> bool {
        !self.children(node).is_empty()
    }

    pub fn index_of(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|c| *c == child)
    }

    /// Index of `node` within its parent
    pub fn parent_index(&self, node: NodeId) -> Option<usize> {
        self.index_of(self.parent(node)?, node)
    }

    /// Iterator over the strict ancestors of `node`, nearest first
    pub fn ancestors(&self, node: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(node),
        }
    }

    /// Distance from `node` to the top of its tree (0 for the root)
    pub fn level(&self, node: NodeId) -> usize {
        self.ancestors(node).count()
    }

    /// Distance to the nearest record-node ancestor, `None` if there is none
    pub fn record_level(&self, node: NodeId) -> Option<usize> {
        self.ancestors(node)
            .position(|a| matches!(self.kind(a), Some(NodeKind::Record { .. })))
            .map(|steps| steps + 1)
    }

    /// Slot index, within the nearest enclosing record node, of the branch
    /// that leads to `node`
    ///
    /// For a node directly under its record node this is the node's own index.
    /// Returns `None` when no record node encloses `node`.
    pub fn record_branch_index(&self, node: NodeId) -> Option<usize> {
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            if matches!(self.kind(parent), Some(NodeKind::Record { .. })) {
                return self.index_of(parent, current);
            }
            current = parent;
        }
        None
    }

    /// Nearest record node, `node` itself included
    pub fn record_node(&self, node: NodeId) -> Option<NodeId> {
        std::iter::once(node)
            .chain(self.ancestors(node))
            .find(|n| matches!(self.kind(*n), Some(NodeKind::Record { .. })))
    }

    /// Record that `node` belongs to, `node` itself included
    pub fn record_of(&self, node: NodeId) -> Option<RecordId> {
        self.record_node(node)
            .and_then(|n| self.kind(n))
            .and_then(NodeKind::record)
    }

    /// Record enclosing the parent of `node`
    pub fn parent_record(&self, node: NodeId) -> Option<RecordId> {
        self.record_of(self.parent(node)?)
    }

    /// Index, under the root, of the top-level branch containing `node`
    pub fn tree_root_index(&self, node: NodeId) -> Option<usize> {
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            if parent == self.root {
                return self.index_of(parent, current);
            }
            current = parent;
        }
        None
    }

    /// Whether `node` is reachable from the root
    pub fn is_attached(&self, node: NodeId) -> bool {
        node == self.root || self.ancestors(node).any(|a| a == self.root)
    }

    /// `node` and all its descendants in pre-order
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            out.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        out
    }

    /// Structural snapshot of the subtree under `node`
    pub fn snapshot(&self, node: NodeId) -> TreeSnapshot {
        TreeSnapshot {
            kind: self.kind(node).cloned().unwrap_or(NodeKind::Root),
            children: self
                .children(node)
                .iter()
                .map(|child| self.snapshot(*child))
                .collect(),
        }
    }

    pub(crate) fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeEntry {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Attach a detached node under `parent`, returning the index used
    pub(crate) fn add(
        &mut self,
        parent: NodeId,
        child: NodeId,
        position: Position,
    ) -> Result<usize, TreeError> {
        if child == self.root {
            return Err(TreeError::RootNotMovable);
        }
        let child_entry = self
            .entry(child)
            .ok_or(TreeError::UnknownNode { node: child })?;
        if let Some(existing) = child_entry.parent {
            return Err(TreeError::AlreadyAttached {
                node: child,
                parent: existing,
            });
        }
        let parent_entry = self
            .entry(parent)
            .ok_or(TreeError::UnknownNode { node: parent })?;
        let len = parent_entry.children.len();
        if let Some(max) = parent_entry.kind.max_children() {
            if len >= max {
                return Err(TreeError::CapacityExceeded {
                    parent,
                    kind: parent_entry.kind.name(),
                });
            }
        }
        let index = position
            .resolve(len)
            .ok_or(TreeError::PositionOutOfRange {
                parent,
                position,
                len,
            })?;

        self.nodes[parent.0].children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
        Ok(index)
    }

    /// Detach `child` from `parent`, returning its former index
    pub(crate) fn remove_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
    ) -> Result<usize, TreeError> {
        let index = self
            .index_of(parent, child)
            .ok_or(TreeError::NotAChild { parent, child })?;
        self.nodes[parent.0].children.remove(index);
        self.nodes[child.0].parent = None;
        Ok(index)
    }

    fn entry(&self, node: NodeId) -> Option<&NodeEntry> {
        self.nodes.get(node.0)
    }
}

/// Iterator returned by [`NodeTree::ancestors`]
pub struct Ancestors<'a> {
    tree: &'a NodeTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

/// Serializable structural image of a subtree
///
/// Two trees are structurally identical when their snapshots compare equal:
/// same node kinds, same record identities, same positions. Arena handles are
/// not part of the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeSnapshot>,
}

impl TreeSnapshot {
    /// Records of the direct children, in order (for record sequences)
    pub fn child_records(&self) -> Vec<RecordId> {
        self.children
            .iter()
            .filter_map(|c| c.kind.record())
            .collect()
    }
}
