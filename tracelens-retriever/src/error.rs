//! Error types for index storage and retrieval

use std::path::PathBuf;

/// Result alias for index storage and retrieval operations.
pub type Result<T> = std::result::Result<T, RetrieverError>;

/// Errors raised by the stores, the indexer, and the retriever.
///
/// The taxonomy separates what callers do about a failure: configuration
/// problems (dimension mismatches, half-deleted indexes) must reach the
/// user; provider failures abort the current run with previously persisted
/// state untouched; "nothing indexed yet" is a normal negative result; and
/// ordinal inconsistencies between the two stores are skipped per result,
/// never crashing a whole search.
#[derive(Debug, thiserror::Error)]
pub enum RetrieverError {
    /// Provider and index disagree about the embedding dimension
    #[error("embedding dimension {provider} does not match index dimension {index}")]
    DimensionMismatch { provider: usize, index: usize },

    /// A vector row with the wrong dimension was handed to `add`
    #[error("cannot add vector of dimension {got} to index of dimension {expected}")]
    RowDimension { expected: usize, got: usize },

    /// No index exists at the given path
    #[error("no index found at {path}")]
    IndexNotFound { path: PathBuf },

    /// Metadata exists but the paired vector store file is gone; a
    /// half-deleted index must not masquerade as "no matches"
    #[error("vector store {path} is missing but metadata lists {records} chunks")]
    MissingVectorStore { path: PathBuf, records: usize },

    /// The vector store file failed structural validation
    #[error("corrupt vector store {path}: {reason}")]
    CorruptStore { path: PathBuf, reason: String },

    /// The embedding provider failed; the run is aborted before any append
    #[error("embedding provider failed: {source}")]
    Provider {
        #[from]
        source: tracelens_embed::EmbedError,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// The metadata file exists but does not decode as a record array
    #[error("metadata decode failed: {source}")]
    Metadata {
        #[from]
        source: serde_json::Error,
    },
}
