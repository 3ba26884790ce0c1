use thiserror::Error;

/// Result type for signature operations
pub type Result<T> = std::result::Result<T, SignatureError>;

/// Errors that can occur while building or decoding signatures
#[derive(Error, Debug)]
pub enum SignatureError {
    /// Failed to parse source code into a tree
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Snapshot document is malformed
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Tree-sitter error
    #[error("Tree-sitter error: {0}")]
    TreeSitterError(String),
}

impl SignatureError {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create an invalid snapshot error
    pub fn invalid_snapshot(msg: impl Into<String>) -> Self {
        Self::InvalidSnapshot(msg.into())
    }

    /// Create a tree-sitter error
    pub fn tree_sitter(msg: impl Into<String>) -> Self {
        Self::TreeSitterError(msg.into())
    }
}
