//! Error types for the editor session

use node_catalog::CatalogError;
use thiserror::Error;
use workflow_graph::GraphError;

/// Result type alias using StudioError
pub type Result<T> = std::result::Result<T, StudioError>;

/// Errors surfaced by persistence and session operations
#[derive(Debug, Error)]
pub enum StudioError {
    /// The request never produced a response
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The workflow service answered with a non-success status
    #[error("Workflow service returned {status}: {detail}")]
    Server { status: u16, detail: String },

    #[error("Workflow not found: {0}")]
    NotFound(String),

    /// The response body did not have the expected shape
    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The editor was torn down while the operation was pending
    #[error("Editor was closed before the operation finished")]
    Detached,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StudioError {
    /// Text for a user-facing notification
    ///
    /// Prefers the server's own detail message when it sent one.
    pub fn user_message(&self) -> String {
        match self {
            Self::Server { detail, .. } if !detail.trim().is_empty() => detail.clone(),
            Self::Server { status, .. } => format!("The workflow service returned an error ({})", status),
            Self::Http(e) if e.is_timeout() => "The workflow service did not respond in time".to_string(),
            Self::Http(_) => "Could not reach the workflow service".to_string(),
            Self::NotFound(id) => format!("Workflow '{}' was not found", id),
            other => other.to_string(),
        }
    }
}
