//! Error types for `BuilderHub` core library.

use thiserror::Error;

/// Result type alias using `BuilderHub` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `BuilderHub` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A dotted overlay path could not be applied to the document.
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// A secrets document contained a leaf that is not a string.
    #[error("Secret value at '{0}' is not a string")]
    NonStringSecret(String),

    /// A document had the wrong top-level shape.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_path(path: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
