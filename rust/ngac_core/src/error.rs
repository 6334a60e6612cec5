//! Error types for the policy engine.

use thiserror::Error;

use crate::types::Kind;

/// Which of the two edge relations an [`NgacError::InvalidEdge`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeRelation {
    Assignment,
    Association,
}

impl std::fmt::Display for EdgeRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeRelation::Assignment => write!(f, "assignment"),
            EdgeRelation::Association => write!(f, "association"),
        }
    }
}

/// Errors returned by the graph store, prohibition store and statements.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NgacError {
    /// A node with this name is already present.
    #[error("name {0:?} already exists")]
    AlreadyExists(String),

    /// Referenced node or prohibition does not exist.
    #[error("{entity} {name:?} does not exist")]
    NotFound { entity: &'static str, name: String },

    /// The kind pair is not allowed for this relation.
    #[error("invalid {relation}: {from} to {to}")]
    InvalidEdge {
        relation: EdgeRelation,
        from: Kind,
        to: Kind,
    },

    /// Delete refused while other nodes are still assigned to this one.
    #[error("cannot delete {0:?} because it has nodes assigned to it")]
    HasChildren(String),

    /// Non policy-class node created without a parent.
    #[error("node {0:?} must be assigned to at least one parent")]
    NoParents(String),

    /// Statement cannot be mapped onto a store call.
    #[error("invalid statement: {0}")]
    InvalidStatement(String),

    /// JSON encode/decode failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl NgacError {
    pub(crate) fn node_not_found(name: &str) -> Self {
        NgacError::NotFound {
            entity: "node",
            name: name.to_string(),
        }
    }

    pub(crate) fn prohibition_not_found(name: &str) -> Self {
        NgacError::NotFound {
            entity: "prohibition",
            name: name.to_string(),
        }
    }
}

impl From<serde_json::Error> for NgacError {
    fn from(e: serde_json::Error) -> Self {
        NgacError::Serialization(e.to_string())
    }
}

/// Result type for policy engine operations.
pub type Result<T> = std::result::Result<T, NgacError>;
