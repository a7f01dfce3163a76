//! Document Error Types
//!
//! Errors raised while projecting the record graph into the node tree, while
//! answering read queries on a document, and while checking that the two
//! structures agree.

use crate::graph::GraphError;
use crate::models::{NodeId, SchemaError, TreeError};
use thiserror::Error;

/// Document operation errors
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Record graph call failed
    #[error("Record graph error: {0}")]
    Graph(#[from] GraphError),

    /// Schema lookup or validation failed
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Tree mutation failed
    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("Node {node} does not exist")]
    UnknownNode { node: NodeId },

    /// Node is not reachable from the document root
    #[error("Node {node} is not attached to the document")]
    Detached { node: NodeId },

    /// Query expected a node of a different kind
    #[error("Node {node} is a {actual} node, expected {expected}")]
    WrongNodeKind {
        node: NodeId,
        expected: &'static str,
        actual: &'static str,
    },

    /// Tree and record graph disagree
    #[error("Tree diverges from record graph at {path}: expected {expected}, found {actual}")]
    Inconsistent {
        path: String,
        expected: String,
        actual: String,
    },
}

impl DocumentError {
    pub fn wrong_node_kind(node: NodeId, expected: &'static str, actual: &'static str) -> Self {
        Self::WrongNodeKind {
            node,
            expected,
            actual,
        }
    }

    pub fn inconsistent(
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Inconsistent {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
