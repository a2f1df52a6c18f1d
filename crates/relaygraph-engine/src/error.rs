//! Error types for the graph engine

use thiserror::Error;

/// Result type alias using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur in the graph engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// No node with this id
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// No input port with this id
    #[error("Input not found: {0}")]
    InputNotFound(String),

    /// No output port with this id
    #[error("Output not found: {0}")]
    OutputNotFound(String),

    /// No link matches the request
    #[error("Link not found: {0}")]
    LinkNotFound(String),

    /// The type tag has no registered factory
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// A node or port id is already used somewhere in the graph
    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    /// The link would close a feedback loop and the cycle policy rejects it
    #[error("Link from '{output_id}' to '{input_id}' would create a cycle")]
    CycleRejected { output_id: String, input_id: String },

    /// A propagation cascade went deeper than the configured bound
    #[error("Cascade depth {depth} exceeded at output '{output_id}'")]
    CascadeDepthExceeded { output_id: String, depth: usize },

    /// `with_node` was asked for the wrong concrete variant
    #[error("Node '{node_id}' is not a {expected}")]
    NodeTypeMismatch { node_id: String, expected: String },

    /// A node hook failed
    #[error("Node failed: {0}")]
    NodeFailed(String),

    /// A graph document failed validation
    #[error("Invalid graph document: {0}")]
    InvalidDocument(String),

    /// Persistence backend error
    #[error("Repository error: {0}")]
    Repository(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Compression error
    #[error("Compression error: {0}")]
    Compression(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Create a node failure with a message
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::NodeFailed(msg.into())
    }

    /// Create a repository error with a message
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}
