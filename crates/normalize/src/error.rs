use thiserror::Error;

/// Result type for normalization operations
pub type Result<T> = std::result::Result<T, NormalizeError>;

/// Errors raised while resolving constants.
///
/// The normalizer itself never fails; these surface from [`crate::ConstantSource`]
/// implementations and are logged by the caller.
#[derive(Error, Debug)]
pub enum NormalizeError {
    /// A registered class could not be loaded
    #[error("Class not found: {0}")]
    ClassNotFound(String),

    /// Malformed constant table
    #[error("Invalid constant table: {0}")]
    InvalidTable(String),

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NormalizeError {
    /// Create a class-not-found error
    pub fn class_not_found(name: impl Into<String>) -> Self {
        Self::ClassNotFound(name.into())
    }

    /// Create an invalid table error
    pub fn invalid_table(msg: impl Into<String>) -> Self {
        Self::InvalidTable(msg.into())
    }
}
