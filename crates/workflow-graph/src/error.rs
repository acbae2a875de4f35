//! Error types for graph editing

use thiserror::Error;

/// Result type alias using GraphError
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that can occur while editing a workflow graph
#[derive(Debug, Error)]
pub enum GraphError {
    /// No node with this id exists
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// No edge with this id exists
    #[error("Edge not found: {0}")]
    EdgeNotFound(String),

    /// A node with this id already exists
    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    /// An edge between the same ports already exists
    #[error("Duplicate edge: {0}")]
    DuplicateEdge(String),

    /// An edge endpoint does not exist
    #[error("Edge '{edge_id}' references missing node '{node_id}'")]
    DanglingEdge { edge_id: String, node_id: String },

    /// An edge would connect a node to itself
    #[error("Edge would connect node '{0}' to itself")]
    SelfLoop(String),

    /// A drag-and-drop payload could not be used
    #[error("Invalid drop payload: {0}")]
    InvalidPayload(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Compression error
    #[error("Compression error: {0}")]
    Compression(String),
}
