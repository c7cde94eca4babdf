use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};

use super::loader::{DatasetFormat, parse_table};
use super::model::RawTable;
use super::source::DataSource;
use crate::ml::{PipelineError, PreparedData, preprocess};

// ---------------------------------------------------------------------------
// ContentHash – cache key
// ---------------------------------------------------------------------------

/// BLAKE3 digest of a dataset's raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(blake3::Hash);

impl ContentHash {
    pub fn of(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes))
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..12])
    }
}

// ---------------------------------------------------------------------------
// LoadedDataset – a parsed table plus its identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub hash: ContentHash,
    pub label: String,
    pub table: Arc<RawTable>,
}

// ---------------------------------------------------------------------------
// DatasetCache – memoizes parsing and preprocessing by content hash
// ---------------------------------------------------------------------------

struct CacheEntry {
    hash: ContentHash,
    table: Arc<RawTable>,
    prepared: Option<Arc<PreparedData>>,
}

/// Bounded memo of parsed tables and their preprocessed form.
///
/// Keys are content hashes, so re-reading an unchanged file is free and any
/// new upload (different bytes) gets a fresh entry. The oldest entry is
/// evicted once `capacity` is exceeded.
pub struct DatasetCache {
    capacity: usize,
    entries: VecDeque<CacheEntry>,
}

impl Default for DatasetCache {
    fn default() -> Self {
        Self::new(4)
    }
}

impl DatasetCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.entries.iter().any(|e| e.hash == *hash)
    }

    /// Read a source from disk and return its (possibly cached) table.
    pub fn load(&mut self, source: &DataSource) -> Result<LoadedDataset> {
        let path = source.path();
        let format = DatasetFormat::from_path(path)?;
        let bytes =
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        self.load_bytes(source.label(), &bytes, format)
    }

    /// Parse `bytes` unless a table with the same content is already cached.
    pub fn load_bytes(
        &mut self,
        label: impl Into<String>,
        bytes: &[u8],
        format: DatasetFormat,
    ) -> Result<LoadedDataset> {
        let label = label.into();
        let hash = ContentHash::of(bytes);

        if let Some(entry) = self.entries.iter().find(|e| e.hash == hash) {
            log::debug!("Dataset cache hit for {label} ({hash})");
            return Ok(LoadedDataset {
                hash,
                label,
                table: Arc::clone(&entry.table),
            });
        }

        let table =
            Arc::new(parse_table(bytes, format).with_context(|| format!("parsing {label}"))?);
        log::info!(
            "Loaded {label}: {} rows, {} columns ({hash})",
            table.n_rows(),
            table.n_cols()
        );

        self.entries.push_back(CacheEntry {
            hash,
            table: Arc::clone(&table),
            prepared: None,
        });
        while self.entries.len() > self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                log::debug!("Evicted dataset {} from cache", evicted.hash);
            }
        }

        Ok(LoadedDataset { hash, label, table })
    }

    /// Preprocess a loaded dataset, reusing a previous result for the same content.
    ///
    /// Failures are not memoized.
    pub fn preprocessed(
        &mut self,
        dataset: &LoadedDataset,
    ) -> Result<Arc<PreparedData>, PipelineError> {
        if let Some(entry) = self.entries.iter().find(|e| e.hash == dataset.hash) {
            if let Some(prepared) = &entry.prepared {
                return Ok(Arc::clone(prepared));
            }
        }

        let prepared = Arc::new(preprocess(&dataset.table)?);
        if let Some(entry) = self.entries.iter_mut().find(|e| e.hash == dataset.hash) {
            entry.prepared = Some(Arc::clone(&prepared));
        }
        Ok(prepared)
    }
}
