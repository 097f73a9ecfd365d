//! Flat L2 vector index with file-backed persistence.
//!
//! The index is a dense row-major matrix of f32 embeddings scanned
//! exhaustively at query time. There is no approximate structure, so results are
//! exact and insert order is identity. The on-disk form is a small header
//! (magic, format version, dimension, row count) followed by the raw f32
//! payload; the dimension in the header is the recorded dimension of the
//! whole index and is validated on every open.

use crate::error::{Result, RetrieverError};
use crate::storage::write_atomic;
use std::path::{Path, PathBuf};

const MAGIC: [u8; 4] = *b"TLVS";
const FORMAT_VERSION: u32 = 1;
/// magic + version + dimension + row count
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// Dense vector index over squared-L2 distance.
#[derive(Debug, Clone)]
pub struct VectorStore {
    path: PathBuf,
    dimension: usize,
    /// Row-major storage; `data.len() == rows * dimension`
    data: Vec<f32>,
}

impl VectorStore {
    /// Open the store at `path`, or start an empty index of the given
    /// dimension when no file exists yet.
    ///
    /// A present file whose recorded dimension differs from `dimension`
    /// fails with [`RetrieverError::DimensionMismatch`]; an index never
    /// changes dimension after its first build.
    pub fn open_or_create(path: &Path, dimension: usize) -> Result<Self> {
        match Self::open(path) {
            Ok(store) => {
                if store.dimension != dimension {
                    return Err(RetrieverError::DimensionMismatch {
                        provider: dimension,
                        index: store.dimension,
                    });
                }
                Ok(store)
            }
            Err(RetrieverError::IndexNotFound { .. }) => {
                tracing::debug!(
                    "No vector store at {}; starting empty (dimension {dimension})",
                    path.display()
                );
                Ok(Self {
                    path: path.to_path_buf(),
                    dimension,
                    data: Vec::new(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Open an existing store, failing with [`RetrieverError::IndexNotFound`]
    /// when the file is absent. This is the read path: a query against a
    /// missing store must error rather than report zero matches.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RetrieverError::IndexNotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let corrupt = |reason: &str| RetrieverError::CorruptStore {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        if bytes.len() < HEADER_LEN {
            return Err(corrupt("file shorter than header"));
        }
        if bytes[0..4] != MAGIC {
            return Err(corrupt("bad magic"));
        }
        let version = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        if version != FORMAT_VERSION {
            return Err(corrupt(&format!("unsupported format version {version}")));
        }
        let dimension = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize;
        let rows = u64::from_le_bytes(bytes[12..20].try_into().unwrap()) as usize;
        if dimension == 0 && rows > 0 {
            return Err(corrupt("zero dimension with non-zero rows"));
        }

        let payload = &bytes[HEADER_LEN..];
        let expected = rows
            .checked_mul(dimension)
            .and_then(|n| n.checked_mul(std::mem::size_of::<f32>()))
            .ok_or_else(|| corrupt("row count overflows"))?;
        if payload.len() != expected {
            return Err(corrupt(&format!(
                "payload is {} bytes, header promises {expected}",
                payload.len()
            )));
        }

        let data: Vec<f32> = bytemuck::pod_collect_to_vec(payload);
        tracing::debug!(
            "Opened vector store {} ({rows} rows, dimension {dimension})",
            path.display()
        );
        Ok(Self {
            path: path.to_path_buf(),
            dimension,
            data,
        })
    }

    /// The recorded dimension of this index.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of vector rows.
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    /// Returns `true` when the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append rows in the exact order given.
    ///
    /// Order matters: the caller appends the matching metadata records in
    /// the same call, and row ordinals are the join key between the stores.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        for vector in vectors {
            if vector.len() != self.dimension {
                return Err(RetrieverError::RowDimension {
                    expected: self.dimension,
                    got: vector.len(),
                });
            }
        }
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    /// Return up to `k` `(ordinal, distance)` pairs nearest to `query`,
    /// ascending by squared-L2 distance (the flat-index convention; the
    /// square root is monotone and never taken).
    ///
    /// An index with fewer than `k` rows returns all rows, no padding.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(RetrieverError::DimensionMismatch {
                provider: query.len(),
                index: self.dimension,
            });
        }

        let mut hits: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(ordinal, row)| {
                let distance: f32 = row
                    .iter()
                    .zip(query)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                (ordinal, distance)
            })
            .collect();

        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        hits.truncate(k);
        Ok(hits)
    }

    /// Persist the full index atomically.
    pub fn persist(&self) -> Result<()> {
        let rows = self.len() as u64;
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.data.len() * 4);
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        bytes.extend_from_slice(&rows.to_le_bytes());
        bytes.extend_from_slice(bytemuck::cast_slice(&self.data));
        write_atomic(&self.path, &bytes)?;
        tracing::debug!("Persisted {} rows to {}", rows, self.path.display());
        Ok(())
    }

    /// Write the raw-vector backup: a NumPy v1.0 `<f4` C-order array with
    /// the same row order as the index. A debugging and audit mirror only;
    /// search correctness never depends on it.
    pub fn write_raw_backup(&self, path: &Path) -> Result<()> {
        let header_dict = format!(
            "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}), }}",
            self.len(),
            self.dimension
        );
        // NPY layout: magic + version + header length + header text,
        // newline-terminated and padded to a 64-byte boundary.
        let mut header = header_dict.into_bytes();
        let unpadded = 10 + header.len() + 1;
        header.extend(std::iter::repeat_n(b' ', (64 - unpadded % 64) % 64));
        header.push(b'\n');

        let mut bytes = Vec::with_capacity(10 + header.len() + self.data.len() * 4);
        bytes.extend_from_slice(b"\x93NUMPY");
        bytes.extend_from_slice(&[1, 0]);
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&header);
        bytes.extend_from_slice(bytemuck::cast_slice(&self.data));
        write_atomic(path, &bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_or_create_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open_or_create(&dir.path().join("index"), 4).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.dimension(), 4);
    }

    #[test]
    fn add_persist_reopen_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index");

        let mut store = VectorStore::open_or_create(&path, 3).unwrap();
        store
            .add(&[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]])
            .unwrap();
        store.persist().unwrap();

        let reopened = VectorStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.dimension(), 3);
        assert_eq!(reopened.data, store.data);
    }

    #[test]
    fn search_orders_by_distance_ascending() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = VectorStore::open_or_create(&dir.path().join("index"), 2).unwrap();
        store
            .add(&[vec![0.0, 0.0], vec![3.0, 4.0], vec![1.0, 0.0]])
            .unwrap();

        let hits = store.search(&[0.0, 0.0], 3).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0], (0, 0.0));
        assert_eq!(hits[1], (2, 1.0));
        assert_eq!(hits[2], (1, 25.0));
    }

    #[test]
    fn search_returns_fewer_than_k_without_padding() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = VectorStore::open_or_create(&dir.path().join("index"), 2).unwrap();
        store.add(&[vec![1.0, 1.0], vec![2.0, 2.0]]).unwrap();

        let hits = store.search(&[0.0, 0.0], 5).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn add_rejects_wrong_row_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = VectorStore::open_or_create(&dir.path().join("index"), 3).unwrap();
        let result = store.add(&[vec![1.0, 2.0]]);
        assert!(matches!(
            result,
            Err(RetrieverError::RowDimension {
                expected: 3,
                got: 2
            })
        ));
        assert!(store.is_empty(), "failed add must not partially append");
    }

    #[test]
    fn search_rejects_wrong_query_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = VectorStore::open_or_create(&dir.path().join("index"), 3).unwrap();
        store.add(&[vec![0.0, 0.0, 0.0]]).unwrap();
        assert!(matches!(
            store.search(&[1.0], 1),
            Err(RetrieverError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn reopen_with_other_dimension_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index");

        let mut store = VectorStore::open_or_create(&path, 3).unwrap();
        store.add(&[vec![0.0, 0.0, 0.0]]).unwrap();
        store.persist().unwrap();

        let result = VectorStore::open_or_create(&path, 8);
        assert!(matches!(
            result,
            Err(RetrieverError::DimensionMismatch {
                provider: 8,
                index: 3
            })
        ));
    }

    #[test]
    fn strict_open_on_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = VectorStore::open(&dir.path().join("missing"));
        assert!(matches!(result, Err(RetrieverError::IndexNotFound { .. })));
    }

    #[test]
    fn truncated_payload_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index");

        let mut store = VectorStore::open_or_create(&path, 4).unwrap();
        store.add(&[vec![1.0, 2.0, 3.0, 4.0]]).unwrap();
        store.persist().unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes.truncate(bytes.len() - 4);
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            VectorStore::open(&path),
            Err(RetrieverError::CorruptStore { .. })
        ));
    }

    #[test]
    fn bad_magic_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index");
        std::fs::write(&path, vec![0u8; HEADER_LEN]).unwrap();
        assert!(matches!(
            VectorStore::open(&path),
            Err(RetrieverError::CorruptStore { .. })
        ));
    }

    #[test]
    fn npy_backup_header_is_well_formed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index");
        let backup = dir.path().join("index.npy");

        let mut store = VectorStore::open_or_create(&path, 2).unwrap();
        store.add(&[vec![1.5, -2.5], vec![0.0, 3.0]]).unwrap();
        store.write_raw_backup(&backup).unwrap();

        let bytes = std::fs::read(&backup).unwrap();
        assert_eq!(&bytes[0..6], b"\x93NUMPY");
        assert_eq!(&bytes[6..8], &[1, 0]);
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + header_len) % 64, 0, "header must pad to 64 bytes");
        let header = std::str::from_utf8(&bytes[10..10 + header_len]).unwrap();
        assert!(header.contains("'descr': '<f4'"));
        assert!(header.contains("'shape': (2, 2)"));
        assert!(header.ends_with('\n'));
        // payload: 2 rows of 2 f32s
        assert_eq!(bytes.len() - 10 - header_len, 16);
    }
}
