//! Error types for node-type discovery

use thiserror::Error;

/// Result type alias using CatalogError
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors that can occur while discovering node types
///
/// Cloneable so one in-flight fetch can hand the same outcome to every
/// caller attached to it.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// Transport-level failure (connect, timeout, TLS)
    #[error("Discovery request to '{source_id}' failed: {message}")]
    Transport { source_id: String, message: String },

    /// The source answered with a non-success status
    #[error("Discovery source '{source_id}' returned {status}: {detail}")]
    Status {
        source_id: String,
        status: u16,
        detail: String,
    },

    /// The payload could not be decoded into node types
    #[error("Malformed payload from '{source_id}': {message}")]
    Malformed { source_id: String, message: String },

    /// The source answered but yielded no usable node types
    #[error("Discovery source '{0}' returned no node types")]
    Empty(String),

    /// Every source, including the bundled catalogue, failed
    #[error("All discovery sources failed: {0}")]
    Exhausted(String),

    /// Client construction failed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CatalogError {
    /// Wrap a reqwest error raised while talking to `source_id`
    pub fn transport(source_id: &str, err: reqwest::Error) -> Self {
        Self::Transport {
            source_id: source_id.to_string(),
            message: err.to_string(),
        }
    }

    pub fn malformed(source_id: &str, msg: impl Into<String>) -> Self {
        Self::Malformed {
            source_id: source_id.to_string(),
            message: msg.into(),
        }
    }
}
