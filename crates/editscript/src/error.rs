use thiserror::Error;

/// Result type for edit script operations
pub type Result<T> = std::result::Result<T, EditScriptError>;

/// Errors that can occur while decoding edit scripts
#[derive(Error, Debug)]
pub enum EditScriptError {
    /// Edit script document is malformed
    #[error("Invalid edit script: {0}")]
    InvalidScript(String),

    /// Unknown operation type
    #[error("Unknown operation type: {0}")]
    UnknownOperation(String),

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EditScriptError {
    /// Create an invalid script error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidScript(msg.into())
    }
}
