use std::path::PathBuf;
use thiserror::Error;

/// Result type for containment checks
pub type Result<T> = std::result::Result<T, ContainmentError>;

/// Errors that abort a containment check
#[derive(Error, Debug)]
pub enum ContainmentError {
    /// No archive path was given
    #[error("Archive path is required")]
    MissingArchive,

    /// The archive under test could not be opened or indexed
    #[error("Cannot inspect archive {path}: {reason}")]
    ArchiveUnavailable { path: PathBuf, reason: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Malformed construct change record
    #[error("Invalid construct change: {0}")]
    InvalidChange(String),

    /// Signature decoding failed
    #[error(transparent)]
    Signature(#[from] fixcheck_signature::SignatureError),

    /// Edit script decoding failed
    #[error(transparent)]
    EditScript(#[from] fixcheck_editscript::EditScriptError),

    /// Constant table decoding failed
    #[error(transparent)]
    Normalize(#[from] fixcheck_normalize::NormalizeError),

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ContainmentError {
    /// Create an archive-unavailable error
    pub fn archive_unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ArchiveUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an invalid change error
    pub fn invalid_change(msg: impl Into<String>) -> Self {
        Self::InvalidChange(msg.into())
    }
}
