//! NDEF Editor Core
//!
//! This crate provides the in-memory document and edit model of an NDEF
//! record editor: a presentation tree kept consistent with an underlying
//! record graph, and reversible structural operations over both.
//!
//! # Architecture
//!
//! - **Dual structure**: the record graph is the document; the node tree is
//!   its uniform projection for generic tree viewers
//! - **Command pattern**: every structural edit is an operation with symmetric
//!   `execute`/`revoke`, driven by an undo/redo history
//! - **Declarative schema**: which record types go into which slots is a
//!   static JSON table, loaded once
//!
//! # Modules
//!
//! - [`models`] - Records, the node tree and the schema registry
//! - [`graph`] - Record graph capability trait and in-memory implementation
//! - [`services`] - Document and node factory
//! - [`operations`] - Reversible edits and undo/redo history
//! - [`config`] - Editor configuration

pub mod config;
pub mod graph;
pub mod models;
pub mod operations;
pub mod services;

// Re-export commonly used types
pub use config::EditorConfig;
pub use graph::{MemoryRecordGraph, RecordGraph, SlotRef};
pub use models::*;
pub use operations::{
    ModelOperation, OperationError, OperationHistory, OperationInfo, OperationState,
};
pub use services::{Document, DocumentError, NodeFactory};
