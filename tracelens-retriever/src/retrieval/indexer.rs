//! Index build orchestration.
//!
//! A build is one pass of an explicit state machine:
//!
//! ```text
//! ENUMERATE → FILTER → EMBED → APPEND → PERSIST
//! ```
//!
//! ENUMERATE walks the repository collecting eligible source files in a
//! stable sorted order. FILTER chunks and hashes each file, dropping every
//! chunk whose content hash the metadata store already knows; this is what
//! makes re-indexing a changed repository cheap, and restarting an aborted
//! run idempotent. EMBED hands the distinct surviving texts to the provider
//! in one ordered batch. APPEND extends the metadata store and the vector
//! store pairwise, and PERSIST writes both (plus the optional raw backup)
//! atomically.
//!
//! A provider failure aborts the run before APPEND, leaving previously
//! persisted state untouched. A single unreadable file is skipped with a
//! warning, not fatal to the run.

use crate::error::Result;
use crate::storage::metadata_store::MetadataStore;
use crate::storage::vector_store::VectorStore;
use crate::storage::{ChunkRecord, IndexPaths};
use ignore::WalkBuilder;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracelens_context::{DEFAULT_CHUNK_SIZE, FixedSizeChunker, content_hash};
use tracelens_embed::{EmbedError, EmbeddingProvider};
use tracing::{debug, info, warn};

/// Directories never descended into during enumeration.
const EXCLUDED_DIRS: &[&str] = &[".git", ".hg", ".svn", "node_modules", "venv", "target"];

/// Default extension allow-list for source files.
pub const DEFAULT_EXTENSIONS: &[&str] = &["py", "js", "ts", "java", "cs", "go", "cpp", "c", "rs"];

/// Configuration for an index build.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Root of the repository to index
    pub repo_path: PathBuf,
    /// On-disk index file triple
    pub index_paths: IndexPaths,
    /// Chunk size in characters, recorded into every new record
    pub chunk_size: usize,
    /// File extensions treated as source code
    pub extensions: Vec<String>,
    /// Whether to mirror vectors into the `.npy` backup after each build
    pub write_raw_backup: bool,
}

impl IndexerConfig {
    /// Configuration with the default chunk size and extension list.
    pub fn new(repo_path: impl Into<PathBuf>, index_prefix: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
            index_paths: IndexPaths::new(index_prefix),
            chunk_size: DEFAULT_CHUNK_SIZE,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            write_raw_backup: true,
        }
    }

    /// Set the chunk size in characters (builder style)
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Replace the extension allow-list (builder style)
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Enable or disable the raw `.npy` backup (builder style)
    pub fn with_raw_backup(mut self, write_raw_backup: bool) -> Self {
        self.write_raw_backup = write_raw_backup;
        self
    }
}

/// What one build pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Source files enumerated (indexed or not)
    pub files_seen: usize,
    /// New (record, vector) pairs appended to the index
    pub chunks_added: usize,
    /// Distinct texts actually embedded; lower than `chunks_added` when
    /// identical content appeared at several positions in one run
    pub embeddings_computed: usize,
}

/// Walks a repository and extends the paired stores with whatever the
/// metadata store does not already know.
pub struct Indexer<P: EmbeddingProvider> {
    config: IndexerConfig,
    provider: P,
}

impl<P: EmbeddingProvider> Indexer<P> {
    pub fn new(config: IndexerConfig, provider: P) -> Self {
        Self { config, provider }
    }

    /// Run one build pass. Re-running against an unchanged repository is a
    /// no-op success: every chunk is recognized by hash and nothing is
    /// embedded or appended.
    pub async fn build(&self) -> Result<BuildReport> {
        info!(
            "Indexing {} into {}",
            self.config.repo_path.display(),
            self.config.index_paths.vectors().display()
        );

        // ENUMERATE
        let files = self.enumerate_files();
        debug!("Enumerated {} candidate files", files.len());

        // FILTER
        let mut metadata = MetadataStore::load(self.config.index_paths.metadata())?;
        let (new_records, new_texts) = self.collect_new_chunks(&files, &metadata);

        if new_records.is_empty() {
            if metadata.is_empty() {
                info!("Nothing to index under {}", self.config.repo_path.display());
            } else {
                info!("No new chunks to index; existing index retained");
            }
            return Ok(BuildReport {
                files_seen: files.len(),
                ..BuildReport::default()
            });
        }

        // EMBED: one provider item per distinct content hash, in stable
        // first-seen order; records sharing a hash reuse the same embedding.
        let mut slot_by_hash: HashMap<String, usize> = HashMap::new();
        let mut distinct_texts: Vec<String> = Vec::new();
        for (record, text) in new_records.iter().zip(&new_texts) {
            slot_by_hash.entry(record.hash.clone()).or_insert_with(|| {
                distinct_texts.push(text.clone());
                distinct_texts.len() - 1
            });
        }
        info!(
            "Embedding {} distinct chunks for {} new records",
            distinct_texts.len(),
            new_records.len()
        );
        let embedded = self.provider.embed_texts(&distinct_texts).await?;
        if embedded.len() != distinct_texts.len() {
            return Err(EmbedError::invalid_config(format!(
                "provider returned {} embeddings for {} inputs",
                embedded.len(),
                distinct_texts.len()
            ))
            .into());
        }

        // APPEND: row i is the embedding of record i's content, so rows and
        // records stay pairwise.
        let mut vectors =
            VectorStore::open_or_create(self.config.index_paths.vectors(), embedded.dimension)?;
        let rows: Vec<Vec<f32>> = new_records
            .iter()
            .map(|record| embedded.embeddings[slot_by_hash[&record.hash]].clone())
            .collect();
        vectors.add(&rows)?;

        // PERSIST
        vectors.persist()?;
        metadata.append(new_records)?;
        if self.config.write_raw_backup {
            let backup_path = self.config.index_paths.raw_backup();
            if let Err(e) = vectors.write_raw_backup(&backup_path) {
                warn!("Failed to write raw vector backup {}: {e}", backup_path.display());
            }
        }

        let report = BuildReport {
            files_seen: files.len(),
            chunks_added: rows.len(),
            embeddings_computed: distinct_texts.len(),
        };
        info!(
            "Indexed {} new chunks from {} files into {}",
            report.chunks_added,
            report.files_seen,
            self.config.index_paths.vectors().display()
        );
        Ok(report)
    }

    /// ENUMERATE: collect eligible source files in stable sorted order.
    fn enumerate_files(&self) -> Vec<PathBuf> {
        let walker = WalkBuilder::new(&self.config.repo_path)
            .sort_by_file_name(std::ffi::OsStr::cmp)
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                !EXCLUDED_DIRS.contains(&name.as_ref())
            })
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unwalkable entry: {e}");
                    continue;
                }
            };
            if entry.file_type().is_some_and(|t| t.is_file())
                && self.has_allowed_extension(entry.path())
            {
                files.push(entry.into_path());
            }
        }
        files
    }

    fn has_allowed_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.config.extensions.iter().any(|allowed| allowed == ext))
    }

    /// FILTER: chunk and hash every enumerated file, keeping chunks whose
    /// content hash is not yet in the metadata store. Unreadable files are
    /// treated as empty.
    fn collect_new_chunks(
        &self,
        files: &[PathBuf],
        metadata: &MetadataStore,
    ) -> (Vec<ChunkRecord>, Vec<String>) {
        let chunker = FixedSizeChunker::new(self.config.chunk_size);
        let known = metadata.known_hashes();

        let mut records = Vec::new();
        let mut texts = Vec::new();
        for file in files {
            let content = match std::fs::read_to_string(file) {
                Ok(content) => content,
                Err(e) => {
                    warn!("Skipping unreadable file {}: {e}", file.display());
                    continue;
                }
            };
            for (position, chunk) in chunker.chunk(&content).into_iter().enumerate() {
                let hash = content_hash(chunk.as_bytes());
                if known.contains(hash.as_str()) {
                    continue;
                }
                records.push(ChunkRecord {
                    path: file.to_string_lossy().to_string(),
                    chunk_index: position,
                    hash,
                    chunk_size: self.config.chunk_size,
                });
                texts.push(chunk);
            }
        }
        (records, texts)
    }
}
