//! Index build orchestration and similarity search.

pub mod indexer;
pub mod retriever;

pub use indexer::{BuildReport, Indexer, IndexerConfig};
pub use retriever::{Retriever, SearchResult};
