//! CSV table persistence.
//!
//! Layout under the data directory:
//!
//! ```text
//! latest/pokemon_cards_full_info.csv      overwritten every run
//! latest/pokemon_sets_summary.csv         overwritten every run
//! archive/<YYYY-MM-DD>/...                 both latest tables, written once
//! pokemon_price_history.csv               long-format history
//! pokemon_price_history.csv.lock          present while a run merges history
//! ```
//!
//! Every table is written to a temp file and renamed into place.

use cardex_core::{Card, PriceObservation, SetSummary, Snapshot};
use chrono::NaiveDate;
use serde::{Serialize, de::DeserializeOwned};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::StoreError;
use crate::history::PriceHistory;
use crate::lock::{DEFAULT_STALE_AFTER, HistoryLock};

/// Directory holding the current snapshot tables.
pub const LATEST_DIR: &str = "latest";
/// Directory holding dated snapshot copies.
pub const ARCHIVE_DIR: &str = "archive";
/// Full card table file name.
pub const CARDS_FILE: &str = "pokemon_cards_full_info.csv";
/// Set summary table file name.
pub const SUMMARY_FILE: &str = "pokemon_sets_summary.csv";
/// Price history file name.
pub const HISTORY_FILE: &str = "pokemon_price_history.csv";

// ============================================================================
// CSV Helpers
// ============================================================================

/// Encodes `rows` as CSV with a header row.
pub fn encode_csv<T: Serialize>(rows: &[T]) -> Result<Vec<u8>, StoreError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| StoreError::Io(e.into_error()))
}

/// Decodes CSV bytes with a header row.
pub fn decode_csv<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>, StoreError> {
    csv::Reader::from_reader(bytes)
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(StoreError::from)
}

/// Writes `bytes` to `path` via a temp file and rename.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let temp_path = path.with_extension("csv.tmp");
    tokio::fs::write(&temp_path, bytes).await?;
    tokio::fs::rename(&temp_path, path).await?;

    debug!(path = %path.display(), bytes = bytes.len(), "Wrote table");
    Ok(())
}

/// Reads a CSV table, returning `None` if the file does not exist.
pub async fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Option<Vec<T>>, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => decode_csv(&bytes).map(Some),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// Snapshot Store
// ============================================================================

/// File-system persistence for snapshots and history, rooted at a data directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
    lock_stale_after: Duration,
}

impl SnapshotStore {
    /// Creates a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock_stale_after: DEFAULT_STALE_AFTER,
        }
    }

    /// Sets the age after which a leftover history lock is reclaimed.
    #[must_use]
    pub fn with_lock_stale_after(mut self, stale_after: Duration) -> Self {
        self.lock_stale_after = stale_after;
        self
    }

    /// Returns the data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the latest full card table.
    pub fn latest_cards_path(&self) -> PathBuf {
        self.root.join(LATEST_DIR).join(CARDS_FILE)
    }

    /// Path of the latest set summary table.
    pub fn latest_summary_path(&self) -> PathBuf {
        self.root.join(LATEST_DIR).join(SUMMARY_FILE)
    }

    /// Directory of the archive for `date`.
    pub fn archive_dir(&self, date: NaiveDate) -> PathBuf {
        self.root
            .join(ARCHIVE_DIR)
            .join(date.format("%Y-%m-%d").to_string())
    }

    /// Path of the price history table.
    pub fn history_path(&self) -> PathBuf {
        self.root.join(HISTORY_FILE)
    }

    /// Path of the history lock file.
    pub fn lock_path(&self) -> PathBuf {
        self.root.join(format!("{HISTORY_FILE}.lock"))
    }

    /// Overwrites both latest tables with `snapshot`.
    #[instrument(skip(self, snapshot), fields(cards = snapshot.cards.len()))]
    pub async fn write_latest(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        write_atomic(&self.latest_cards_path(), &encode_csv(&snapshot.cards)?).await?;
        write_atomic(&self.latest_summary_path(), &encode_csv(&snapshot.summaries)?).await?;
        info!(
            sets = snapshot.summaries.len(),
            cards = snapshot.cards.len(),
            "Wrote latest snapshot"
        );
        Ok(())
    }

    /// Writes the dated archive copy of `snapshot`.
    ///
    /// Returns `false` without writing if an archive for `date` already exists.
    /// Both tables are written into `<date>.tmp/` first and the directory is
    /// renamed into place, so a dated directory is always complete.
    #[instrument(skip(self, snapshot))]
    pub async fn archive(&self, snapshot: &Snapshot, date: NaiveDate) -> Result<bool, StoreError> {
        let dir = self.archive_dir(date);
        if tokio::fs::try_exists(&dir).await? {
            info!(path = %dir.display(), "Archive already exists, leaving it as is");
            return Ok(false);
        }

        let staging = dir.with_extension("tmp");
        match tokio::fs::remove_dir_all(&staging).await {
            Ok(()) => warn!(path = %staging.display(), "Removed leftover archive staging directory"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::create_dir_all(&staging).await?;

        write_atomic(&staging.join(CARDS_FILE), &encode_csv(&snapshot.cards)?).await?;
        write_atomic(&staging.join(SUMMARY_FILE), &encode_csv(&snapshot.summaries)?).await?;
        tokio::fs::rename(&staging, &dir).await?;

        info!(path = %dir.display(), "Archived snapshot");
        Ok(true)
    }

    /// Reads the previous run's set summaries; empty if none were written.
    pub async fn read_latest_summaries(&self) -> Result<Vec<SetSummary>, StoreError> {
        Ok(read_table(&self.latest_summary_path()).await?.unwrap_or_default())
    }

    /// Reads the previous run's card table; empty if none was written.
    pub async fn read_latest_cards(&self) -> Result<Vec<Card>, StoreError> {
        Ok(read_table(&self.latest_cards_path()).await?.unwrap_or_default())
    }

    /// Loads the price history; empty if the file does not exist yet.
    pub async fn load_history(&self) -> Result<PriceHistory, StoreError> {
        let rows: Vec<PriceObservation> = read_table(&self.history_path())
            .await?
            .unwrap_or_default();
        debug!(rows = rows.len(), "Loaded price history");
        Ok(PriceHistory::from_observations(rows))
    }

    /// Replaces the stored price history.
    pub async fn save_history(&self, history: &PriceHistory) -> Result<(), StoreError> {
        let rows: Vec<&PriceObservation> = history.iter().collect();
        write_atomic(&self.history_path(), &encode_csv(&rows)?).await?;
        info!(rows = rows.len(), "Saved price history");
        Ok(())
    }

    /// Takes the exclusive history lock.
    pub fn lock_history(&self) -> Result<HistoryLock, StoreError> {
        HistoryLock::acquire_with(&self.lock_path(), self.lock_stale_after)
    }
}

// ============================================================================
// Tests
// ============================================================================
