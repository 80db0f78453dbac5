//! Error types for Larder

use thiserror::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the Larder pipeline
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Embedding rejected: {0}")]
    EmbeddingRejected(String),

    #[error("Embedding malformed: {0}")]
    EmbeddingMalformed(String),

    #[error("Index creation failed: {0}")]
    IndexCreationFailed(String),

    #[error("Search unavailable: {0}")]
    SearchUnavailable(String),

    #[error("Completion unavailable: {0}")]
    CompletionUnavailable(String),

    #[error("Document store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether retrying the same call may succeed. Only provider
    /// reachability failures qualify; a request the provider rejected
    /// outright fails the same way every time.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::EmbeddingUnavailable(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
