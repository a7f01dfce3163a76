//! Record Graph Layer
//!
//! This module defines the `RecordGraph` trait, the capability interface the
//! editor core uses to attach and detach records. The core never reaches into
//! a record's encoding; it only needs:
//!
//! - identity and type of each record
//! - connect / disconnect of a child record to a slot of a parent (or the message)
//! - capability queries and slot contents
//! - primitive property and binary content get/set
//! - insert, remove and replace of value list elements
//!
//! Graph calls touch the graph only, never the presentation tree.
//!
//! # Examples
//!
//! ```rust
//! use ndef_editor_core::graph::{MemoryRecordGraph, RecordGraph, SlotRef};
//! use ndef_editor_core::models::SchemaRegistry;
//!
//! let schema = SchemaRegistry::ndef().unwrap();
//! let mut graph = MemoryRecordGraph::new(schema);
//!
//! let text = graph.create_record("text").unwrap();
//! graph.connect(&SlotRef::message(), text, 0).unwrap();
//! assert_eq!(graph.children(&SlotRef::message()).unwrap(), &[text]);
//! ```

mod error;
mod memory_graph;
mod snapshot;

pub use error::GraphError;
pub use memory_graph::MemoryRecordGraph;
pub use snapshot::{GraphSnapshot, RecordSnapshot, SlotSnapshot};

use crate::models::{Capabilities, ListValue, PropertyValue, RecordId, MESSAGE_SLOT};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Owner of a slot: the message itself or a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotOwner {
    Message,
    Record(RecordId),
}

/// Address of a record slot in the graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRef {
    pub owner: SlotOwner,
    pub slot: String,
}

impl SlotRef {
    /// The message-level sequence of top-level records
    pub fn message() -> Self {
        Self {
            owner: SlotOwner::Message,
            slot: MESSAGE_SLOT.to_string(),
        }
    }

    pub fn record(record: RecordId, slot: impl Into<String>) -> Self {
        Self {
            owner: SlotOwner::Record(record),
            slot: slot.into(),
        }
    }

    pub fn owner_record(&self) -> Option<RecordId> {
        match self.owner {
            SlotOwner::Message => None,
            SlotOwner::Record(record) => Some(record),
        }
    }
}

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.owner {
            SlotOwner::Message => write!(f, "message.{}", self.slot),
            SlotOwner::Record(record) => write!(f, "{}.{}", record, self.slot),
        }
    }
}

/// Capability interface over the underlying record object graph
///
/// Implementations must leave the graph unchanged when a mutating call
/// returns an error.
pub trait RecordGraph {
    /// Allocate a new, unattached record of `record_type`
    fn create_record(&mut self, record_type: &str) -> Result<RecordId, GraphError>;

    fn record_type(&self, record: RecordId) -> Option<&str>;

    fn contains(&self, record: RecordId) -> bool {
        self.record_type(record).is_some()
    }

    fn capabilities_of(&self, record: RecordId) -> Result<Capabilities, GraphError>;

    /// Slot the record is currently connected to, if any
    fn owner_of(&self, record: RecordId) -> Option<&SlotRef>;

    /// Records connected to `slot`, in order
    fn children(&self, slot: &SlotRef) -> Result<&[RecordId], GraphError>;

    /// Number of child records connected to any slot of `record`
    fn child_count(&self, record: RecordId) -> usize;

    /// Attach an unattached `child` at `index` of `slot`
    fn connect(
        &mut self,
        slot: &SlotRef,
        child: RecordId,
        index: usize,
    ) -> Result<(), GraphError>;

    /// Detach `child` from `slot`, returning its former index
    fn disconnect(&mut self, slot: &SlotRef, child: RecordId) -> Result<usize, GraphError>;

    fn content(&self, record: RecordId, slot: &str) -> Result<Option<&[u8]>, GraphError>;

    /// Replace (or clear with `None`) a binary content buffer, returning the previous one
    fn set_content(
        &mut self,
        record: RecordId,
        slot: &str,
        bytes: Option<Vec<u8>>,
    ) -> Result<Option<Vec<u8>>, GraphError>;

    fn property(
        &self,
        record: RecordId,
        slot: &str,
    ) -> Result<Option<&PropertyValue>, GraphError>;

    /// Replace (or clear with `None`) a primitive property, returning the previous value
    fn set_property(
        &mut self,
        record: RecordId,
        slot: &str,
        value: Option<PropertyValue>,
    ) -> Result<Option<PropertyValue>, GraphError>;

    /// Elements of a property list or binary list slot, in order
    fn values(&self, record: RecordId, slot: &str) -> Result<&[ListValue], GraphError>;

    /// Insert `value` at `index` of a value list slot
    fn insert_value(
        &mut self,
        record: RecordId,
        slot: &str,
        index: usize,
        value: ListValue,
    ) -> Result<(), GraphError>;

    /// Remove and return the element at `index` of a value list slot
    fn remove_value(
        &mut self,
        record: RecordId,
        slot: &str,
        index: usize,
    ) -> Result<ListValue, GraphError>;

    /// Replace the element at `index` of a value list slot, returning the previous one
    fn replace_value(
        &mut self,
        record: RecordId,
        slot: &str,
        index: usize,
        value: ListValue,
    ) -> Result<ListValue, GraphError>;
}
