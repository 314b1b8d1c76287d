//! Error types for the workflow canvas

use thiserror::Error;

use crate::config::ConfigError;
use crate::connection::ConnectionRejection;

/// Result type alias using CanvasError
pub type Result<T> = std::result::Result<T, CanvasError>;

/// Errors that can occur while mutating the canvas graph
///
/// Abandoned gestures (cancelled connection drags, empty drops, box
/// selections that enclose nothing) are not errors and never produce one.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// A node id that is not part of the graph
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// A connection id that is not part of the graph
    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    /// A connection request that failed validation
    #[error("Invalid connection: {0}")]
    InvalidConnection(#[from] ConnectionRejection),

    /// Configuration rejected by validation
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Snapshot compression error
    #[error("Compression error: {0}")]
    Compression(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CanvasError {
    /// Create a node-not-found error
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound(id.into())
    }

    /// Create a connection-not-found error
    pub fn connection_not_found(id: impl Into<String>) -> Self {
        Self::ConnectionNotFound(id.into())
    }
}
