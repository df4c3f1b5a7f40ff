//! Error types for coderag-index.

use std::path::PathBuf;

use crate::vector_store::VectorStoreError;

/// Errors that can occur while indexing or querying a collection.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// IO error on the source tree or index directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Vector store failure.
    #[error("vector store error: {0}")]
    Store(#[from] VectorStoreError),

    /// Embedding provider failure.
    #[error("LLM error: {0}")]
    Llm(#[from] coderag_llm::LlmError),

    /// A collection opened for reading does not exist.
    #[error("collection '{collection}' was not found in {}", db_dir.display())]
    CollectionNotFound { collection: String, db_dir: PathBuf },

    /// Caller-supplied value rejected before any I/O.
    #[error("{0}")]
    InvalidArgument(String),

    /// Background ingest task panicked or was cancelled.
    #[error("ingest task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("{0}")]
    Other(String),
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
