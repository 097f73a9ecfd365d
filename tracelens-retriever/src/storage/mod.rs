//! On-disk index layout and shared storage types.
//!
//! An index is a triple of files sharing a caller-supplied prefix `P`:
//!
//! - `P`: the flat L2 vector store ([`vector_store::VectorStore`])
//! - `P.meta`: ordered JSON array of [`ChunkRecord`]s
//!   ([`metadata_store::MetadataStore`])
//! - `P.npy`: optional raw-vector backup, a NumPy `<f4` array mirror
//!
//! The i-th record in `P.meta` describes the i-th vector row in `P`. That
//! ordinal correspondence is the consistency invariant of the whole index:
//! any operation appending to one store must append to the other in the
//! same call. Each file is written atomically (temp file + rename) so
//! concurrent readers observe either the old or the new complete state.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracelens_context::DEFAULT_CHUNK_SIZE;

pub mod metadata_store;
pub mod vector_store;

/// One indexed chunk: where it came from and what its content was.
///
/// Records are created during indexing and never mutated. The `hash` is the
/// dedup key: it identifies *content*, not a (path, position) pair, so two
/// records may legitimately share a hash when identical code appears in two
/// places. Records for deleted or renamed files persist until a full
/// rebuild; incremental runs never evict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Path of the source file as seen at index time
    pub path: String,
    /// Zero-based ordinal of the chunk within its file
    pub chunk_index: usize,
    /// Hex blake3 digest of the chunk's bytes; the dedup key
    pub hash: String,
    /// Chunk size in characters used when this record was created.
    /// Re-reading the snippet with any other size yields the wrong text, so
    /// the size travels with the record; records written without the field
    /// load with the build default.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

/// The three on-disk paths derived from an index prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPaths {
    prefix: PathBuf,
}

impl IndexPaths {
    /// Derive the index file paths from a prefix.
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Path of the vector store (the prefix itself).
    pub fn vectors(&self) -> &Path {
        &self.prefix
    }

    /// Path of the metadata file (`<prefix>.meta`).
    pub fn metadata(&self) -> PathBuf {
        with_suffix(&self.prefix, ".meta")
    }

    /// Path of the raw-vector backup (`<prefix>.npy`).
    pub fn raw_backup(&self) -> PathBuf {
        with_suffix(&self.prefix, ".npy")
    }
}

/// Append a suffix to a path without treating it as an extension swap
/// (`index.bin` + `.meta` = `index.bin.meta`).
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Write `bytes` to `path` atomically.
///
/// The bytes go to a temp file in the same directory, get flushed, and the
/// temp file is renamed over the destination. A crash mid-write leaves the
/// previous file intact; readers never observe a partially written store.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = with_suffix(path, ".tmp");
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_paths_share_prefix() {
        let paths = IndexPaths::new("/tmp/demo/index.bin");
        assert_eq!(paths.vectors(), Path::new("/tmp/demo/index.bin"));
        assert_eq!(paths.metadata(), Path::new("/tmp/demo/index.bin.meta"));
        assert_eq!(paths.raw_backup(), Path::new("/tmp/demo/index.bin.npy"));
    }

    #[test]
    fn chunk_record_json_shape() {
        let record = ChunkRecord {
            path: "src/lib.rs".to_string(),
            chunk_index: 3,
            hash: "abc123".to_string(),
            chunk_size: 512,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["path"], "src/lib.rs");
        assert_eq!(json["chunk_index"], 3);
        assert_eq!(json["hash"], "abc123");
        assert_eq!(json["chunk_size"], 512);
    }

    #[test]
    fn chunk_record_defaults_missing_chunk_size() {
        // Metadata written before the field existed still loads.
        let record: ChunkRecord =
            serde_json::from_str(r#"{"path":"a.py","chunk_index":0,"hash":"ff"}"#).unwrap();
        assert_eq!(record.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn write_atomic_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("state.json");
        write_atomic(&target, b"first").unwrap();
        write_atomic(&target, b"second").unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"second");
        // No temp file left behind
        assert!(!dir.path().join("state.json.tmp").exists());
    }
}
