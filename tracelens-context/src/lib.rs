//! # tracelens-context
//!
//! Chunking policy and content hashing for the tracelens semantic code index.
//!
//! Source files are split into fixed-size, position-ordered chunks of text;
//! each chunk's bytes are hashed to a stable digest that serves as its
//! identity for incremental re-indexing. Both halves are deliberately tiny:
//! the chunk boundaries and the digest together define what "the same chunk"
//! means for the rest of the system, so they must stay bit-stable across
//! runs and platforms.

pub mod chunk;
pub mod hash;

pub use chunk::{DEFAULT_CHUNK_SIZE, FixedSizeChunker};
pub use hash::content_hash;
