//! Durable storage for the pet state record.
//!
//! The record is a small JSON document:
//!
//! ```json
//! {
//!   "hunger": 80,
//!   "energy": 75,
//!   "affection": 70,
//!   "lastUpdated": "2025-03-01T12:00:00Z"
//! }
//! ```
//!
//! Stores only move bytes; [`encode`] and [`decode`] map them to and from
//! [`PetStats`].

use crate::error::{Error, Result};
use crate::stats::PetStats;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Byte-level storage for a single pet state record.
pub trait StateStore: Send + Sync {
    /// Read the stored record, or `None` if nothing has been saved yet.
    fn read(&self) -> Result<Option<Vec<u8>>>;

    /// Replace the stored record.
    fn write(&self, bytes: &[u8]) -> Result<()>;
}

/// Stores the record in a JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StateStore for FileStore {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(Error::StateRead {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Write to a temporary file beside the record, then rename it over
    /// the record. A crash mid-write leaves the previous record intact.
    fn write(&self, bytes: &[u8]) -> Result<()> {
        let write_err = |source: std::io::Error| Error::StateWrite {
            path: self.path.clone(),
            source,
        };
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(write_err)?;

        let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        staged.write_all(bytes).map_err(write_err)?;
        staged.as_file().sync_all().map_err(write_err)?;
        staged.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

/// Keeps the record in memory only.
#[derive(Debug, Default)]
pub struct MemoryStore {
    bytes: Mutex<Option<Vec<u8>>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with `bytes`.
    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Mutex::new(Some(bytes.into())),
        }
    }

    /// The currently stored bytes, if any.
    pub fn contents(&self) -> Option<Vec<u8>> {
        self.bytes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl StateStore for MemoryStore {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.contents())
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        *self.bytes.lock().unwrap_or_else(|e| e.into_inner()) = Some(bytes.to_vec());
        Ok(())
    }
}

/// On-disk shape, accepted loosely so that out-of-range stats can be
/// clamped instead of rejected.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    hunger: i64,
    energy: i64,
    affection: i64,
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
}

/// Serialize a snapshot to the stored record format.
pub fn encode(stats: &PetStats) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(stats).map_err(|source| Error::StateEncode { source })
}

/// Parse a stored record.
///
/// Returns `None` for malformed JSON or a missing or zero timestamp (at or
/// before the Unix epoch). Stat values outside `[0, 100]` are clamped.
pub fn decode(bytes: &[u8]) -> Option<PetStats> {
    let record: StoredRecord = match serde_json::from_slice(bytes) {
        Ok(record) => record,
        Err(e) => {
            debug!(error = %e, "discarding malformed pet state record");
            return None;
        }
    };
    let last_updated = match record.last_updated {
        Some(ts) if ts.timestamp() > 0 => ts,
        _ => {
            debug!("discarding pet state record without a timestamp");
            return None;
        }
    };
    Some(PetStats::clamped(
        record.hunger,
        record.energy,
        record.affection,
        last_updated,
    ))
}

/// Encode and write a snapshot.
pub fn save(store: &dyn StateStore, stats: &PetStats) -> Result<()> {
    store.write(&encode(stats)?)
}

/// Read and decode a snapshot, treating malformed content as absent.
pub fn load(store: &dyn StateStore) -> Result<Option<PetStats>> {
    Ok(store.read()?.as_deref().and_then(decode))
}
