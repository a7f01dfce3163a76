//! Data Models
//!
//! This module contains the core data structures of the editor:
//!
//! - `Record` - one entity of the record graph, with its type tag
//! - `NodeTree` - arena-backed presentation tree over the record graph
//! - `SchemaRegistry` - static table of record types, slots and admissible children
//!
//! The built-in NDEF table is available through `SchemaRegistry::ndef()`.

mod ndef_schema;
mod node;
mod record;
pub mod schema;

#[cfg(test)]
mod node_test;

pub use ndef_schema::NDEF_SCHEMA_JSON;
pub use node::{Ancestors, NodeId, NodeKind, NodeTree, Position, TreeError, TreeSnapshot};
pub use record::{Capabilities, ListValue, PropertyValue, Record, RecordId};
pub use schema::{
    AdmissibleEntry, Arity, RecordTypeDef, SchemaError, SchemaRegistry, SlotDef, SlotKind,
    MESSAGE_SLOT,
};
