//! Structural Edit Operations
//!
//! Every structural edit of a [`Document`] is a command object implementing
//! [`ModelOperation`]. An operation is constructed against the current
//! document (which validates the request against the schema and fails before
//! anything changes), then moved between two states:
//!
//! ```text
//!            execute()
//!  Pending ────────────► Executed
//!     ▲                     │
//!     └─────────────────────┘
//!            revoke()
//! ```
//!
//! `execute` applies up to four sub-steps: detach the prior occupant from the
//! graph, clear the tree slot, attach the new record to the graph, insert its
//! node into the tree. `revoke` undoes them. If a record graph call fails part
//! way, the completed sub-steps are rolled back before the error is returned,
//! so callers only ever see "succeeded" or "failed, nothing changed".
//!
//! Executing again after a revoke reproduces the same graph and tree. Records
//! are created once, at construction; tree nodes are built on the first
//! execute and reattached on every later one, so operations recorded after
//! this one keep addressing live nodes across undo and redo.
//!
//! # Examples
//!
//! ```rust
//! use ndef_editor_core::models::Position;
//! use ndef_editor_core::operations::{InsertSiblingOperation, ModelOperation};
//! use ndef_editor_core::operations::{OperationInfo, OperationState};
//! use ndef_editor_core::services::Document;
//!
//! let mut doc = Document::ndef().unwrap();
//! let mut insert = InsertSiblingOperation::new(&mut doc, Position::End, "text").unwrap();
//!
//! insert.execute(&mut doc).unwrap();
//! assert_eq!(doc.tree().child_count(doc.root()), 1);
//!
//! insert.revoke(&mut doc).unwrap();
//! assert_eq!(doc.tree().child_count(doc.root()), 0);
//! assert_eq!(insert.state(), OperationState::Pending);
//! ```

mod add_child;
mod content;
pub mod error;
mod history;
mod list;
mod parent_property;
mod sibling;
mod transaction;
mod value_list;

pub use add_child::add_child;
pub use content::{SetContentOperation, SetPropertyOperation};
pub use error::OperationError;
pub use history::{OperationHistory, DEFAULT_MAX_UNDO_DEPTH};
pub use list::{InsertListItemOperation, RemoveListItemOperation};
pub use parent_property::SetChildOperation;
pub use sibling::{InsertSiblingOperation, MoveRecordOperation, RemoveRecordOperation};
pub use value_list::{InsertValueOperation, RemoveValueOperation};

use crate::graph::{RecordGraph, SlotRef};
use crate::models::{NodeId, NodeKind, RecordId};
use crate::services::Document;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    /// Constructed or revoked; holds intent only
    Pending,
    Executed,
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationState::Pending => write!(f, "pending"),
            OperationState::Executed => write!(f, "executed"),
        }
    }
}

/// Identity and lifecycle of an operation, independent of the graph backend
pub trait OperationInfo: fmt::Debug {
    /// Short stable name, used in logs and errors
    fn name(&self) -> &'static str;

    fn state(&self) -> OperationState;
}

/// A reversible structural edit
pub trait ModelOperation<G: RecordGraph>: OperationInfo {
    /// Apply the edit. Fails with `InvalidState` when already executed.
    fn execute(&mut self, doc: &mut Document<G>) -> Result<(), OperationError>;

    /// Undo the edit. Fails with `InvalidState` when not executed.
    fn revoke(&mut self, doc: &mut Document<G>) -> Result<(), OperationError>;
}

/// Report a state machine violation
fn misuse(
    operation: &'static str,
    action: &'static str,
    state: OperationState,
) -> OperationError {
    tracing::error!("Operation '{}' cannot {} while {}", operation, action, state);
    OperationError::invalid_state(operation, action, state)
}

fn target_kind<G: RecordGraph>(
    doc: &Document<G>,
    node: NodeId,
) -> Result<&NodeKind, OperationError> {
    doc.tree()
        .kind(node)
        .ok_or_else(|| OperationError::invalid_target(node, "node does not exist"))
}

/// Kind of an attached node
fn attached_kind<G: RecordGraph>(
    doc: &Document<G>,
    node: NodeId,
) -> Result<&NodeKind, OperationError> {
    let kind = target_kind(doc, node)?;
    if !doc.tree().is_attached(node) {
        return Err(OperationError::invalid_target(node, "node is not attached"));
    }
    Ok(kind)
}

/// Record wrapped by the record node directly under a list item or slot node
fn record_under<G: RecordGraph>(
    doc: &Document<G>,
    holder: NodeId,
) -> Result<(NodeId, RecordId), OperationError> {
    doc.tree()
        .child(holder, 0)
        .and_then(|node| Some((node, doc.tree().kind(node)?.record()?)))
        .ok_or_else(|| OperationError::invalid_target(holder, "holds no record"))
}

/// Type of the record owning `slot`, `None` for the message
fn owner_type<'d, G: RecordGraph>(
    doc: &'d Document<G>,
    slot: &SlotRef,
) -> Result<Option<&'d str>, OperationError> {
    match slot.owner_record() {
        None => Ok(None),
        Some(owner) => doc
            .graph()
            .record_type(owner)
            .map(Some)
            .ok_or_else(|| crate::graph::GraphError::unknown_record(owner).into()),
    }
}

/// Validate that a caller-supplied record can be placed in `slot`
fn check_detached_record<G: RecordGraph>(
    doc: &Document<G>,
    slot: &SlotRef,
    record: RecordId,
) -> Result<(), OperationError> {
    let graph = doc.graph();
    let record_type = graph
        .record_type(record)
        .ok_or_else(|| crate::graph::GraphError::unknown_record(record))?;
    if let Some(owner) = graph.owner_of(record) {
        return Err(crate::graph::GraphError::AlreadyConnected {
            record,
            owner: owner.clone(),
        }
        .into());
    }
    doc.schema()
        .validate(owner_type(doc, slot)?, &slot.slot, record_type)?;
    Ok(())
}

/// Node standing for `record` in `target`, built on first use
///
/// Later calls return the cached node so a re-execute reattaches the same
/// subtree instead of allocating a new one.
fn cached_node<G: RecordGraph>(
    doc: &mut Document<G>,
    cache: &mut Option<NodeId>,
    record: RecordId,
    target: &SlotRef,
) -> Result<NodeId, OperationError> {
    if let Some(node) = *cache {
        return Ok(node);
    }
    let node = doc.build_node(record, target)?;
    *cache = Some(node);
    Ok(node)
}

/// Validate then create a fresh record destined for `slot`
fn create_for_slot<G: RecordGraph>(
    doc: &mut Document<G>,
    slot: &SlotRef,
    record_type: &str,
) -> Result<RecordId, OperationError> {
    doc.schema()
        .validate(owner_type(doc, slot)?, &slot.slot, record_type)?;
    Ok(doc.graph_mut().create_record(record_type)?)
}
