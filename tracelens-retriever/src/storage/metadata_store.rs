//! Ordered chunk-record store persisted as a single JSON array.

use crate::error::Result;
use crate::storage::{ChunkRecord, write_atomic};
use std::collections::HashSet;
use std::path::PathBuf;

/// Ordered sequence of [`ChunkRecord`]s backing one index.
///
/// The order is load-bearing: record *i* describes vector row *i* in the
/// paired vector store. Incremental runs only ever append; existing records
/// are never reordered or deleted. Persistence rewrites the whole array to
/// a temp file and renames it into place, since an in-place append could leave a
/// valid-looking but truncated array behind on a crash, and the format must
/// stay a single JSON array.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    path: PathBuf,
    records: Vec<ChunkRecord>,
}

impl MetadataStore {
    /// Load the store at `path`.
    ///
    /// A genuinely absent file means "no index yet" and yields an empty
    /// store. A file that exists but cannot be read or decoded is surfaced
    /// as an error instead of being silently treated as empty; losing
    /// track of indexed content would desynchronize the two stores.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(
            "Loaded {} chunk records from {}",
            records.len(),
            path.display()
        );
        Ok(Self { path, records })
    }

    /// All records, in vector-row order.
    pub fn records(&self) -> &[ChunkRecord] {
        &self.records
    }

    /// Record for the given vector-row ordinal, if it exists.
    pub fn get(&self, ordinal: usize) -> Option<&ChunkRecord> {
        self.records.get(ordinal)
    }

    /// Number of records (equals the paired store's row count for any
    /// consistently persisted index).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when nothing has been indexed yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The set of content hashes already indexed, for incremental-skip.
    pub fn known_hashes(&self) -> HashSet<&str> {
        self.records.iter().map(|r| r.hash.as_str()).collect()
    }

    /// Append records in order and persist the full updated sequence
    /// atomically.
    pub fn append(&mut self, records: Vec<ChunkRecord>) -> Result<()> {
        self.records.extend(records);
        let bytes = serde_json::to_vec(&self.records)?;
        write_atomic(&self.path, &bytes)?;
        Ok(())
    }
}
