//! Document Services
//!
//! This module contains the pieces that tie the record graph to the
//! presentation tree:
//!
//! - `Document` - owns graph, tree and schema; read queries and consistency checks
//! - `NodeFactory` - builds node subtrees for records without touching the graph
//! - `DocumentError` - errors raised by both
//!
//! Structural edits are not performed here; see [`crate::operations`].

pub mod document;
pub mod error;
pub mod node_factory;

pub use document::Document;
pub use error::DocumentError;
pub use node_factory::NodeFactory;
