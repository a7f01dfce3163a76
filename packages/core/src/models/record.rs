//! Record Data Structures
//!
//! A record is one semantic unit of an NDEF document. The editor core does not
//! know what a record encodes on the wire; it only needs:
//!
//! - an identity (`RecordId`, allocated by the record graph)
//! - a type tag (key into the [`SchemaRegistry`](crate::models::SchemaRegistry))
//! - the structural slots declared for that type, which determine its
//!   [`Capabilities`]
//!
//! # Examples
//!
//! ```rust
//! use ndef_editor_core::models::{PropertyValue, Record, RecordId};
//!
//! let mut record = Record::new(RecordId::new(1), "text".to_string());
//! record.set_property("text", Some(PropertyValue::from("hello")));
//!
//! assert_eq!(record.property("text"), Some(&PropertyValue::Text("hello".to_string())));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Handle of a record inside a record graph
///
/// Ids are allocated sequentially by the graph so that replaying the same
/// edits produces the same ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(u64);

impl RecordId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record#{}", self.0)
    }
}

/// Structural capability set of a record type
///
/// Derived from the record type's slot table, never stored per record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// Has at least one single-valued record slot
    pub has_children: bool,
    /// Has at least one ordered list slot
    pub has_list: bool,
    /// Has at least one binary content or binary list slot
    pub has_content: bool,
}

/// Primitive property value held by a leaf property slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PropertyValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// One element of a value list slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ListValue {
    Property(PropertyValue),
    Binary(Vec<u8>),
}

impl ListValue {
    pub fn as_property(&self) -> Option<&PropertyValue> {
        match self {
            ListValue::Property(value) => Some(value),
            ListValue::Binary(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ListValue::Binary(bytes) => Some(bytes),
            ListValue::Property(_) => None,
        }
    }

    pub fn into_property(self) -> Option<PropertyValue> {
        match self {
            ListValue::Property(value) => Some(value),
            ListValue::Binary(_) => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            ListValue::Binary(bytes) => Some(bytes),
            ListValue::Property(_) => None,
        }
    }
}

/// One record entity of the record graph
///
/// Child references are stored per slot name. Single-valued slots hold at most
/// one entry; the graph enforces that arity on connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    id: RecordId,
    record_type: String,
    children: BTreeMap<String, Vec<RecordId>>,
    properties: BTreeMap<String, PropertyValue>,
    content: BTreeMap<String, Vec<u8>>,
    values: BTreeMap<String, Vec<ListValue>>,
}

impl Record {
    /// Create an empty record of the given type
    pub fn new(id: RecordId, record_type: String) -> Self {
        Self {
            id,
            record_type,
            children: BTreeMap::new(),
            properties: BTreeMap::new(),
            content: BTreeMap::new(),
            values: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// Child records connected to `slot`, in slot order
    pub fn children(&self, slot: &str) -> &[RecordId] {
        self.children.get(slot).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of child records across all slots
    pub fn child_count(&self) -> usize {
        self.children.values().map(Vec::len).sum()
    }

    pub(crate) fn children_mut(&mut self, slot: &str) -> &mut Vec<RecordId> {
        self.children.entry(slot.to_string()).or_default()
    }

    pub fn property(&self, slot: &str) -> Option<&PropertyValue> {
        self.properties.get(slot)
    }

    /// Replace a property value, returning the previous one
    pub fn set_property(
        &mut self,
        slot: &str,
        value: Option<PropertyValue>,
    ) -> Option<PropertyValue> {
        match value {
            Some(value) => self.properties.insert(slot.to_string(), value),
            None => self.properties.remove(slot),
        }
    }

    pub fn content(&self, slot: &str) -> Option<&[u8]> {
        self.content.get(slot).map(Vec::as_slice)
    }

    /// Replace a binary content buffer, returning the previous one
    pub fn set_content(&mut self, slot: &str, bytes: Option<Vec<u8>>) -> Option<Vec<u8>> {
        match bytes {
            Some(bytes) => self.content.insert(slot.to_string(), bytes),
            None => self.content.remove(slot),
        }
    }

    /// Elements of a value list slot, in order
    pub fn values(&self, slot: &str) -> &[ListValue] {
        self.values.get(slot).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn values_mut(&mut self, slot: &str) -> &mut Vec<ListValue> {
        self.values.entry(slot.to_string()).or_default()
    }
}
