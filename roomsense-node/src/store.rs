//! Time-series stores for environment records
//!
//! The polling loop appends one [`EnvironmentRecord`] per cycle through the
//! [`TimeSeriesStore`] trait. Two implementations ship: a bounded in-memory
//! window for the dashboard's recent-history queries, and an append-only
//! JSON-lines file for durable capture.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use roomsense_core::{EnvironmentRecord, Timestamp};

/// Failure of a store operation
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record violates the store's ordering invariant
    #[error("record at {attempted} is older than the newest stored record at {newest}")]
    OutOfOrder {
        /// Capture timestamp of the rejected record
        attempted: Timestamp,
        /// Capture timestamp of the newest record already stored
        newest: Timestamp,
    },

    /// Underlying file I/O failed
    #[error("store i/o: {0}")]
    Io(#[from] std::io::Error),

    /// A stored line could not be encoded or decoded
    #[error("store codec: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Append-only, time-ordered sink and query surface for cycle records
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    /// Append one cycle's record. Records must arrive in non-decreasing
    /// `captured_at` order.
    async fn append(&self, record: &EnvironmentRecord) -> Result<(), StoreError>;

    /// All records with `captured_at` in `from..=to`, oldest first
    async fn query_range(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<EnvironmentRecord>, StoreError>;

    /// The newest record, if any
    async fn latest(&self) -> Result<Option<EnvironmentRecord>, StoreError>;
}

/// Bounded in-memory window of the most recent records
///
/// Backs the dashboard's recent-history view: once `window` records are held,
/// each append evicts the oldest.
pub struct MemoryStore {
    window: usize,
    records: RwLock<VecDeque<EnvironmentRecord>>,
}

impl MemoryStore {
    /// A store retaining at most `window` records (at least one)
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            records: RwLock::new(VecDeque::new()),
        }
    }

    /// Number of records currently held
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    /// Whether the window is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TimeSeriesStore for MemoryStore {
    async fn append(&self, record: &EnvironmentRecord) -> Result<(), StoreError> {
        let mut records = self
            .records
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(newest) = records.back() {
            if record.captured_at < newest.captured_at {
                return Err(StoreError::OutOfOrder {
                    attempted: record.captured_at,
                    newest: newest.captured_at,
                });
            }
        }

        records.push_back(record.clone());
        while records.len() > self.window {
            records.pop_front();
        }
        Ok(())
    }

    async fn query_range(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<EnvironmentRecord>, StoreError> {
        let records = self
            .records
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(records
            .iter()
            .filter(|r| (from..=to).contains(&r.captured_at))
            .cloned()
            .collect())
    }

    async fn latest(&self) -> Result<Option<EnvironmentRecord>, StoreError> {
        let records = self
            .records
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(records.back().cloned())
    }
}

/// Durable append-only store, one JSON object per line
///
/// Queries re-read the whole file; at one record per polling cycle that is
/// acceptable for the retention this node targets.
pub struct JsonlStore {
    path: std::path::PathBuf,
    file: Mutex<File>,
    newest: Mutex<Option<Timestamp>>,
}

impl JsonlStore {
    /// Open (or create) the file at `path` for appending.
    ///
    /// Scans existing content once to recover the newest timestamp so the
    /// ordering invariant survives restarts.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        let newest = Self::read_all(&path)
            .await?
            .last()
            .map(|record| record.captured_at);

        Ok(Self {
            path,
            file: Mutex::new(file),
            newest: Mutex::new(newest),
        })
    }

    async fn read_all(path: &Path) -> Result<Vec<EnvironmentRecord>, StoreError> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        let mut records = Vec::new();
        for (index, line) in lines.iter().enumerate() {
            match serde_json::from_str(line) {
                Ok(record) => records.push(record),
                Err(err) => {
                    // A final line with no trailing newline is a write still
                    // in flight from another process, not corruption.
                    if index + 1 == lines.len() && !text.ends_with('\n') {
                        log::warn!("skipping partial trailing line in {}", path.display());
                        break;
                    }
                    return Err(err.into());
                }
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl TimeSeriesStore for JsonlStore {
    async fn append(&self, record: &EnvironmentRecord) -> Result<(), StoreError> {
        let mut newest = self.newest.lock().await;
        if let Some(ts) = *newest {
            if record.captured_at < ts {
                return Err(StoreError::OutOfOrder {
                    attempted: record.captured_at,
                    newest: ts,
                });
            }
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        *newest = Some(record.captured_at);
        Ok(())
    }

    async fn query_range(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<EnvironmentRecord>, StoreError> {
        // Serialize with appends so a query never sees a half-written line
        // from this process
        let _file = self.file.lock().await;
        Ok(Self::read_all(&self.path)
            .await?
            .into_iter()
            .filter(|r| (from..=to).contains(&r.captured_at))
            .collect())
    }

    async fn latest(&self) -> Result<Option<EnvironmentRecord>, StoreError> {
        let _file = self.file.lock().await;
        Ok(Self::read_all(&self.path).await?.pop())
    }
}
