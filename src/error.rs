//! Error types for partlex.

use thiserror::Error;

/// Result type for partlex operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for partlex operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Knowledge base could not be loaded or saved.
    #[error("Knowledge base error: {0}")]
    KnowledgeBase(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Record storage failed.
    #[error("Store error: {0}")]
    Store(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a knowledge base error.
    pub fn knowledge_base(msg: impl Into<String>) -> Self {
        Error::KnowledgeBase(msg.into())
    }

    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create a store error.
    pub fn store(msg: impl Into<String>) -> Self {
        Error::Store(msg.into())
    }
}
