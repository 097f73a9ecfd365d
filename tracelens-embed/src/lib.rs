//! # tracelens-embed
//!
//! Embedding providers for the tracelens semantic code index.
//!
//! A provider turns a batch of text chunks into fixed-dimension f32 vectors.
//! Three backends hide behind one trait:
//!
//! - **Hash**: deterministic feature-hashing embeddings for reproducible
//!   tests and offline runs; no model, no network.
//! - **Local**: ONNX models run locally through fastembed (the default is
//!   all-MiniLM-L6-v2), with a process-wide model cache.
//! - **Remote**: an OpenAI-style embeddings endpoint called once per item,
//!   with whole-call failure on any item error.
//!
//! Selection happens through an explicit [`EmbedConfig`] resolved into an
//! [`AnyProvider`] at construction; there is no environment-driven state.
//! The output dimension is fixed per provider instance, and any index built
//! with one dimension must be queried with the same one.
//!
//! ```no_run
//! use tracelens_embed::{AnyProvider, EmbedConfig, EmbeddingProvider};
//!
//! # async fn example() -> tracelens_embed::Result<()> {
//! let provider = AnyProvider::create(EmbedConfig::hash(64)).await?;
//! let result = provider.embed_texts(&["fn main() {}".to_string()]).await?;
//! assert_eq!(result.dimension, 64);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod provider;
pub mod remote;

pub use config::{
    DEFAULT_HASH_DIMENSION, DEFAULT_LOCAL_MODEL, DEFAULT_REMOTE_TIMEOUT_SECS, EmbedConfig,
    ProviderConfig,
};
pub use error::{EmbedError, Result};
pub use provider::{
    AnyProvider, EmbeddingProvider, EmbeddingResult, FastEmbedProvider, HashEmbedProvider,
};
pub use remote::RemoteApiProvider;
