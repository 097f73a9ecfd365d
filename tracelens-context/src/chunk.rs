//! Fixed-size text chunking.
//!
//! Files are split into contiguous, non-overlapping spans of up to
//! `chunk_size` **characters** (not bytes), in document order; the final
//! chunk may be shorter. Concatenating the chunks reconstructs the original
//! text exactly.
//!
//! The chunk size is part of a chunk's identity: a chunk's ordinal position
//! only resolves back to the same text when recomputed with the size used to
//! produce it. Callers that re-read chunks later (snippet display) must
//! record the size alongside the position rather than assume a default;
//! [`FixedSizeChunker::chunk_at`] exists for exactly that re-read path.
//!
//! # Example
//!
//! ```
//! use tracelens_context::FixedSizeChunker;
//!
//! let chunker = FixedSizeChunker::new(4);
//! let chunks = chunker.chunk("hello");
//! assert_eq!(chunks, vec!["hell".to_string(), "o".to_string()]);
//! assert_eq!(chunker.chunk_at("hello", 1).as_deref(), Some("o"));
//! assert_eq!(chunker.chunk_at("hello", 2), None);
//! ```

/// Default chunk size in characters, matching the index build default.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Splits text into fixed-size character chunks.
///
/// The chunker is a pure policy object: it holds only the configured size
/// and never touches the filesystem. Empty input yields an empty sequence,
/// not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSizeChunker {
    chunk_size: usize,
}

impl FixedSizeChunker {
    /// Create a chunker for the given chunk size in characters.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero; a zero-width chunk policy can never
    /// make progress through a non-empty file.
    pub fn new(chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be non-zero");
        Self { chunk_size }
    }

    /// The configured chunk size in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Split `text` into ordered chunks of up to `chunk_size` characters.
    ///
    /// A text of exactly `chunk_size` characters yields one chunk; one more
    /// character yields a second chunk of length 1. Empty text yields no
    /// chunks.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut len = 0usize;
        for ch in text.chars() {
            current.push(ch);
            len += 1;
            if len == self.chunk_size {
                chunks.push(std::mem::take(&mut current));
                len = 0;
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }

    /// Recompute the chunk at a given zero-based position, or `None` when
    /// the position lies beyond the end of `text`.
    ///
    /// Equivalent to `self.chunk(text).get(position)` without materializing
    /// the preceding chunks.
    pub fn chunk_at(&self, text: &str, position: usize) -> Option<String> {
        let start = position.checked_mul(self.chunk_size)?;
        let chunk: String = text.chars().skip(start).take(self.chunk_size).collect();
        if chunk.is_empty() { None } else { Some(chunk) }
    }
}

impl Default for FixedSizeChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}
