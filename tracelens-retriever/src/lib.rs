//! # tracelens-retriever
//!
//! The incremental semantic code index at the core of tracelens.
//!
//! An index lives in three files sharing a prefix `P`: the flat L2 vector
//! store (`P`), an ordered JSON array of chunk records (`P.meta`), and an
//! optional raw-vector backup (`P.npy`). The i-th metadata record describes
//! the i-th vector row; this is the ordinal correspondence every operation here is
//! built to preserve.
//!
//! ## Key modules
//!
//! - **[`storage`]**: the on-disk layout, [`storage::metadata_store`] and
//!   [`storage::vector_store`]
//! - **[`retrieval`]**: the [`retrieval::Indexer`] build pipeline and the
//!   [`retrieval::Retriever`] query side
//! - **[`error`]**: the error taxonomy shared by both
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use tracelens_embed::{AnyProvider, EmbedConfig};
//! use tracelens_retriever::retrieval::{Indexer, IndexerConfig, Retriever};
//! use tracelens_retriever::storage::IndexPaths;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let provider = AnyProvider::create(EmbedConfig::hash(64)).await?;
//! let config = IndexerConfig::new("./my-repo", "./index.tlvs");
//!
//! Indexer::new(config.clone(), provider.clone()).build().await?;
//!
//! let retriever = Retriever::open(&IndexPaths::new("./index.tlvs"), provider)?;
//! let results = retriever.search("at MyApp.Service.Handle", 5).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Writers to one index prefix must be serialized externally (one build at
//! a time); reads against a persisted index are safe alongside each other
//! because every on-disk write is atomic.

pub mod error;
pub mod retrieval;
pub mod storage;

pub use error::{Result, RetrieverError};
