//! Similarity search over a persisted index.

use crate::error::{Result, RetrieverError};
use crate::storage::metadata_store::MetadataStore;
use crate::storage::vector_store::VectorStore;
use crate::storage::{ChunkRecord, IndexPaths};
use serde::Serialize;
use tracelens_context::FixedSizeChunker;
use tracelens_embed::{EmbedError, EmbeddingProvider};
use tracing::{debug, warn};

/// One similarity hit: the stored record, the chunk text as it exists on
/// disk right now, and the squared-L2 distance to the query.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub record: ChunkRecord,
    /// Chunk text re-read at query time; empty when the file is gone or
    /// shrank past the recorded position
    pub snippet: String,
    /// Squared L2 distance; ascending means closer
    pub distance: f32,
}

/// Read-side handle over one persisted index.
///
/// The retriever embeds free text (typically a raw stack-frame line)
/// through the same provider family that built the index and resolves
/// nearest vector rows back to chunk records and live snippets.
pub struct Retriever<P: EmbeddingProvider> {
    metadata: MetadataStore,
    vectors: VectorStore,
    provider: P,
}

impl<P: EmbeddingProvider> Retriever<P> {
    /// Open a persisted index for querying.
    ///
    /// Open-time validation distinguishes the states a caller must not
    /// confuse:
    /// - nothing indexed at the prefix → [`RetrieverError::IndexNotFound`]
    /// - metadata present but the vector file gone →
    ///   [`RetrieverError::MissingVectorStore`] (a half-deleted index must
    ///   not masquerade as "no matches")
    /// - provider dimension differs from the recorded index dimension →
    ///   [`RetrieverError::DimensionMismatch`]
    pub fn open(paths: &IndexPaths, provider: P) -> Result<Self> {
        let metadata = MetadataStore::load(paths.metadata())?;
        if metadata.is_empty() {
            return Err(RetrieverError::IndexNotFound {
                path: paths.vectors().to_path_buf(),
            });
        }

        let vectors = match VectorStore::open(paths.vectors()) {
            Ok(vectors) => vectors,
            Err(RetrieverError::IndexNotFound { path }) => {
                return Err(RetrieverError::MissingVectorStore {
                    path,
                    records: metadata.len(),
                });
            }
            Err(e) => return Err(e),
        };

        if provider.embedding_dimension() != vectors.dimension() {
            return Err(RetrieverError::DimensionMismatch {
                provider: provider.embedding_dimension(),
                index: vectors.dimension(),
            });
        }

        if metadata.len() != vectors.len() {
            // Tolerated: an interrupted build can leave one store a batch
            // ahead of the other. Resolution skips unmatched ordinals.
            warn!(
                "Index stores disagree: {} records vs {} vectors",
                metadata.len(),
                vectors.len()
            );
        }

        Ok(Self {
            metadata,
            vectors,
            provider,
        })
    }

    /// Embed `query` and return up to `top_k` results, ascending by
    /// distance.
    ///
    /// Vector rows without a matching metadata record are skipped rather
    /// than failing the search, so a damaged index degrades to fewer
    /// results instead of crashing every query.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        let embedded = self.provider.embed_texts(&[query.to_string()]).await?;
        let query_vector = embedded
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::invalid_config("provider returned no query embedding"))?;

        let hits = self.vectors.search(&query_vector, top_k)?;
        let mut results = Vec::with_capacity(hits.len());
        for (ordinal, distance) in hits {
            let Some(record) = self.metadata.get(ordinal) else {
                warn!("Skipping vector row {ordinal} with no metadata record");
                continue;
            };
            results.push(SearchResult {
                record: record.clone(),
                snippet: read_chunk_snippet(record),
                distance,
            });
        }
        debug!("Query matched {} results", results.len());
        Ok(results)
    }

    /// Number of indexed records.
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    /// Returns `true` when the index has no records.
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }
}

/// Re-read a record's chunk from the file as it currently exists on disk.
///
/// Intentional staleness tolerance: the record's path and hash identify
/// what was *indexed*; the snippet shown is whatever is on disk *now*. A
/// missing file or an out-of-range position yields an empty snippet.
fn read_chunk_snippet(record: &ChunkRecord) -> String {
    let content = match std::fs::read_to_string(&record.path) {
        Ok(content) => content,
        Err(e) => {
            debug!("Snippet re-read failed for {}: {e}", record.path);
            return String::new();
        }
    };
    FixedSizeChunker::new(record.chunk_size)
        .chunk_at(&content, record.chunk_index)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_reread_tracks_disk_state() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.rs");
        std::fs::write(&file, "fn foo() {}").unwrap();

        let record = ChunkRecord {
            path: file.to_string_lossy().to_string(),
            chunk_index: 0,
            hash: "unused".to_string(),
            chunk_size: 1024,
        };
        assert_eq!(read_chunk_snippet(&record), "fn foo() {}");

        std::fs::write(&file, "fn foo() { changed() }").unwrap();
        assert_eq!(read_chunk_snippet(&record), "fn foo() { changed() }");

        std::fs::remove_file(&file).unwrap();
        assert_eq!(read_chunk_snippet(&record), "");
    }

    #[test]
    fn snippet_position_beyond_eof_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.rs");
        std::fs::write(&file, "short").unwrap();

        let record = ChunkRecord {
            path: file.to_string_lossy().to_string(),
            chunk_index: 7,
            hash: "unused".to_string(),
            chunk_size: 16,
        };
        assert_eq!(read_chunk_snippet(&record), "");
    }
}
