//! Error types for the embedding system

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Error type for all embedding operations.
///
/// Covers configuration validation, model loading, local inference, and
/// remote endpoint failures. A failure anywhere in a batch fails the whole
/// `embed` call, so callers never receive a short or misaligned batch.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// Provider configuration is invalid
    #[error("invalid embedding configuration: {message}")]
    InvalidConfig { message: String },

    /// Error during model initialization
    #[error("model initialization failed: {source}")]
    ModelInitialization {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A remote embedding request failed; `index` is the position of the
    /// offending item within the batch
    #[error("embedding request for batch item {index} failed: {message}")]
    Request { index: usize, message: String },

    /// Async task join errors
    #[error("async task failed: {source}")]
    AsyncTask {
        #[from]
        source: tokio::task::JoinError,
    },

    /// Generic errors from other libraries
    #[error("external error: {source}")]
    External {
        #[from]
        source: anyhow::Error,
    },
}

impl EmbedError {
    /// Create an invalid configuration error with a custom message.
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a model initialization error from any error type.
    pub fn model_init<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ModelInitialization {
            source: Box::new(source),
        }
    }

    /// Create a remote request error for the batch item at `index`.
    pub fn request<S: Into<String>>(index: usize, message: S) -> Self {
        Self::Request {
            index,
            message: message.into(),
        }
    }
}
