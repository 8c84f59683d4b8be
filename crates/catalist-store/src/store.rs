//! Per-project result store
//!
//! Directory layout:
//! ```text
//! {catalog_dir}/{project}/results/
//! └── {blake3(path)}.json    # one ProcessingRecord per scanned file
//! ```
//!
//! Replacement is delete-then-insert: inserting over an existing record is
//! a caller protocol violation and fails with [`StoreError::Conflict`].
//! Two workers racing to insert for the same path resolve the same way:
//! one wins the exclusive create, the loser gets the conflict.

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use catalist_core::ProjectId;

use crate::record::{CatalogEntry, FailureKind, ProcessingRecord, RecordStatus};

/// Error from a store operation.
#[derive(Debug)]
pub enum StoreError {
    /// Insert attempted over an existing record without a prior delete.
    Conflict { path: String },
    Io(std::io::Error),
    Serde(serde_json::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conflict { path } => {
                write!(f, "record already exists for {path} (delete before re-insert)")
            }
            Self::Io(e) => write!(f, "IO: {e}"),
            Self::Serde(e) => write!(f, "record encoding: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Conflict { .. } => None,
            Self::Io(e) => Some(e),
            Self::Serde(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e)
    }
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Record filename stem for a file path.
fn record_key(path: &str) -> String {
    blake3::hash(path.as_bytes()).to_hex().to_string()
}

/// Durable store of per-file processing outcomes for one project.
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    /// Open (creating if needed) the results store for a project.
    pub fn for_project(catalog_dir: &Path, project: &ProjectId) -> Result<Self, StoreError> {
        let dir = catalog_dir.join(project.as_str()).join("results");
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn record_path(&self, path: &str) -> PathBuf {
        self.dir.join(format!("{}.json", record_key(path)))
    }

    fn read_record(&self, path: &str) -> Result<Option<ProcessingRecord>, StoreError> {
        let file = self.record_path(path);
        let json = match fs::read_to_string(&file) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&json)?))
    }

    /// Outcome of the last attempt for `path`.
    ///
    /// An unreadable or corrupt record counts as a failure: the scanner
    /// will clear it and reattempt, which self-heals the store.
    pub fn status(&self, path: &str) -> RecordStatus {
        match self.read_record(path) {
            Ok(Some(record)) => record.status(),
            Ok(None) => RecordStatus::Absent,
            Err(e) => {
                log::warn!("unreadable record for {path}: {e}");
                RecordStatus::Failure
            }
        }
    }

    pub fn has_succeeded(&self, path: &str) -> bool {
        self.status(path) == RecordStatus::Success
    }

    /// Remove any record for `path`. No-op if absent.
    pub fn delete(&self, path: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.record_path(path)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn insert_success(&self, path: &str, content: CatalogEntry) -> Result<(), StoreError> {
        self.insert_record(&ProcessingRecord::success(path, content))
    }

    pub fn insert_failure(
        &self,
        path: &str,
        kind: FailureKind,
        message: &str,
    ) -> Result<(), StoreError> {
        self.insert_record(&ProcessingRecord::failure(path, kind, message))
    }

    fn insert_record(&self, record: &ProcessingRecord) -> Result<(), StoreError> {
        let file = self.record_path(&record.path);
        let mut out = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&file)
        {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StoreError::Conflict {
                    path: record.path.clone(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        let json = serde_json::to_string_pretty(record)?;
        out.write_all(json.as_bytes())?;
        Ok(())
    }

    /// All records, skipping unreadable files with a warning.
    fn records(&self) -> Result<Vec<ProcessingRecord>, StoreError> {
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let json = fs::read_to_string(&path)?;
            match serde_json::from_str(&json) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("skipping corrupt record {}: {e}", path.display()),
            }
        }
        Ok(records)
    }

    /// Paths of all successfully processed files.
    pub fn successful_paths(&self) -> Result<BTreeSet<String>, StoreError> {
        Ok(self
            .records()?
            .into_iter()
            .filter(|r| r.status() == RecordStatus::Success)
            .map(|r| r.path)
            .collect())
    }

    /// Dataset identifiers with at least one successful record.
    pub fn successful_dataset_ids(&self) -> Result<BTreeSet<String>, StoreError> {
        Ok(self
            .records()?
            .iter()
            .filter_map(|r| r.content())
            .map(|c| c.ds_id.clone())
            .collect())
    }

    /// Recorded content for one path, if it succeeded.
    pub fn content(&self, path: &str) -> Result<Option<CatalogEntry>, StoreError> {
        Ok(self
            .read_record(path)?
            .and_then(|r| r.content().cloned()))
    }

    /// Content of all success records, sorted by relative path.
    pub fn all_content(&self) -> Result<Vec<CatalogEntry>, StoreError> {
        let mut entries: Vec<CatalogEntry> = self
            .records()?
            .iter()
            .filter_map(|r| r.content())
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    pub fn count_failures(&self) -> Result<usize, StoreError> {
        Ok(self
            .records()?
            .iter()
            .filter(|r| r.status() == RecordStatus::Failure)
            .count())
    }

    /// Failure records for operator review, sorted by path.
    pub fn failures(&self) -> Result<Vec<ProcessingRecord>, StoreError> {
        let mut failures: Vec<ProcessingRecord> = self
            .records()?
            .into_iter()
            .filter(|r| r.status() == RecordStatus::Failure)
            .collect();
        failures.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(failures)
    }

    /// Irreversibly remove the project's results. Teardown/testing only.
    pub fn drop_results(&self) -> Result<(), StoreError> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
