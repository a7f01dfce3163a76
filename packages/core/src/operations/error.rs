//! Error types for structural edit operations
//!
//! Operation errors fall into three groups:
//!
//! - **Construction**: the requested placement is not allowed by the schema or
//!   the target node is of the wrong kind. Nothing has changed.
//! - **State machine misuse**: executing twice, revoking before executing.
//!   Nothing has changed.
//! - **Adapter failure mid-execute**: a graph call failed after some sub-steps
//!   ran. Completed sub-steps are rolled back before the error is returned; if
//!   that rollback itself fails the error is `RollbackFailed`.

use crate::graph::GraphError;
use crate::models::{NodeId, SchemaError, TreeError};
use crate::operations::OperationState;
use crate::services::DocumentError;
use thiserror::Error;

/// Errors that can occur while constructing, executing or revoking an operation
///
/// # Examples
///
/// ```rust
/// use ndef_editor_core::operations::{OperationError, OperationState};
///
/// let err = OperationError::invalid_state("insert_sibling", "revoke", OperationState::Pending);
/// assert_eq!(
///     err.to_string(),
///     "Operation 'insert_sibling' cannot revoke while pending"
/// );
/// ```
#[derive(Error, Debug)]
pub enum OperationError {
    /// The schema forbids the requested placement
    #[error("Schema violation: {0}")]
    Schema(#[from] SchemaError),

    /// Record graph call failed
    #[error("Record graph error: {0}")]
    Graph(#[from] GraphError),

    /// Tree mutation failed
    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    /// Document query failed
    #[error("Document error: {0}")]
    Document(DocumentError),

    /// `execute` on an executed operation, or `revoke` on a pending one
    #[error("Operation '{operation}' cannot {action} while {state}")]
    InvalidState {
        operation: &'static str,
        action: &'static str,
        state: OperationState,
    },

    /// The target node cannot receive this operation
    #[error("Invalid target {node}: {reason}")]
    InvalidTarget { node: NodeId, reason: String },

    /// A failed operation could not be rolled back
    ///
    /// Tree and graph may disagree after this error; the document should be
    /// reloaded from the graph.
    #[error("Rollback of '{operation}' failed: {rollback} (while recovering from: {cause})")]
    RollbackFailed {
        operation: &'static str,
        cause: Box<OperationError>,
        rollback: Box<OperationError>,
    },
}

impl OperationError {
    pub fn invalid_state(
        operation: &'static str,
        action: &'static str,
        state: OperationState,
    ) -> Self {
        Self::InvalidState {
            operation,
            action,
            state,
        }
    }

    pub fn invalid_target(node: NodeId, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            node,
            reason: reason.into(),
        }
    }

    pub fn rollback_failed(
        operation: &'static str,
        cause: OperationError,
        rollback: OperationError,
    ) -> Self {
        Self::RollbackFailed {
            operation,
            cause: Box::new(cause),
            rollback: Box::new(rollback),
        }
    }

    /// Whether the document was left untouched by the failed call
    pub fn is_clean(&self) -> bool {
        !matches!(self, Self::RollbackFailed { .. })
    }
}

impl From<DocumentError> for OperationError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::Graph(err) => Self::Graph(err),
            DocumentError::Schema(err) => Self::Schema(err),
            DocumentError::Tree(err) => Self::Tree(err),
            other => Self::Document(other),
        }
    }
}
