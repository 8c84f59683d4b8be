//! Per-dataset scan state machine
//!
//! For every file of a dataset the scanner decides skip / retry / process
//! against the result store, runs the extractor, and records the outcome.
//! Per-file failures are absorbed and recorded; they never escape `scan`,
//! so one bad file cannot take down its siblings or the rest of a batch.

use std::path::Path;

use anyhow::{Context, Result};

use catalist_core::DatasetId;
use catalist_store::{CatalogEntry, FailureKind, RecordStatus, ResultStore, StoreError};

use crate::extract::{Extractor, FileLister};

/// Store operations the scanner needs; implemented by [`ResultStore`].
///
/// The seam exists so scan behavior (notably write-failure classification)
/// can be exercised against an injected faulty store.
pub trait RecordSink {
    fn status(&self, path: &str) -> RecordStatus;
    fn delete(&self, path: &str) -> Result<(), StoreError>;
    fn insert_success(&self, path: &str, content: CatalogEntry) -> Result<(), StoreError>;
    fn insert_failure(
        &self,
        path: &str,
        kind: FailureKind,
        message: &str,
    ) -> Result<(), StoreError>;
}

impl RecordSink for ResultStore {
    fn status(&self, path: &str) -> RecordStatus {
        ResultStore::status(self, path)
    }

    fn delete(&self, path: &str) -> Result<(), StoreError> {
        ResultStore::delete(self, path)
    }

    fn insert_success(&self, path: &str, content: CatalogEntry) -> Result<(), StoreError> {
        ResultStore::insert_success(self, path, content)
    }

    fn insert_failure(
        &self,
        path: &str,
        kind: FailureKind,
        message: &str,
    ) -> Result<(), StoreError> {
        ResultStore::insert_failure(self, path, kind, message)
    }
}

/// Terminal outcome for one path within a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathOutcome {
    /// Already recorded successful; extraction not attempted.
    Skipped,
    Succeeded,
    Failed(FailureKind),
}

/// Counts for one `scan` call (or an aggregation of several).
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanSummary {
    pub files: usize,
    pub skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl ScanSummary {
    pub fn new(files: usize) -> Self {
        Self {
            files,
            ..Self::default()
        }
    }

    pub fn merge(&mut self, other: &ScanSummary) {
        self.files += other.files;
        self.skipped += other.skipped;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }

    pub fn log(&self) {
        log::info!(
            "Files: {} ({} skipped, {} succeeded, {} failed)",
            self.files,
            self.skipped,
            self.succeeded,
            self.failed
        );
    }
}

/// The unit of work: scans one dataset's files against the result store.
pub struct Scanner<'a, S, L, E> {
    store: &'a S,
    lister: &'a L,
    extractor: &'a E,
    force: bool,
}

impl<'a, S, L, E> Scanner<'a, S, L, E>
where
    S: RecordSink,
    L: FileLister,
    E: Extractor,
{
    pub fn new(store: &'a S, lister: &'a L, extractor: &'a E, force: bool) -> Self {
        Self {
            store,
            lister,
            extractor,
            force,
        }
    }

    /// Process every file of `id`, recording one terminal outcome per path.
    ///
    /// Only file enumeration can fail here; per-file problems are recorded
    /// in the store and absorbed. Re-running without `force` converges:
    /// successful paths are skipped, failed paths are retried.
    pub fn scan(&self, id: &DatasetId) -> Result<ScanSummary> {
        log::info!("Reading {id}");
        let fpaths = self
            .lister
            .files(id)
            .with_context(|| format!("failed to list files for {id}"))?;

        let mut summary = ScanSummary::new(fpaths.len());
        for fpath in &fpaths {
            match self.process_path(id, fpath) {
                PathOutcome::Skipped => summary.skipped += 1,
                PathOutcome::Succeeded => summary.succeeded += 1,
                PathOutcome::Failed(_) => summary.failed += 1,
            }
        }
        Ok(summary)
    }

    fn process_path(&self, id: &DatasetId, path: &Path) -> PathOutcome {
        let key = path.to_string_lossy();

        if self.force && self.store.status(&key) != RecordStatus::Absent {
            log::info!("Clearing record for forced re-run: {}", path.display());
            if let Err(e) = self.store.delete(&key) {
                log::error!("failed to clear record for {}: {e}", path.display());
                return PathOutcome::Failed(FailureKind::Write);
            }
        }

        match self.store.status(&key) {
            RecordStatus::Success => {
                log::info!("Already cataloged: {}", path.display());
                return PathOutcome::Skipped;
            }
            RecordStatus::Failure => {
                // Bare retry policy: clear the stale failure and reattempt
                log::info!("Clearing stale failure: {}", path.display());
                if let Err(e) = self.store.delete(&key) {
                    log::error!("failed to clear record for {}: {e}", path.display());
                    return PathOutcome::Failed(FailureKind::Write);
                }
            }
            RecordStatus::Absent => {}
        }

        log::info!("Scanning file: {}", path.display());
        let content = match self.extractor.extract(id, path) {
            Ok(content) => content,
            Err(e) => {
                let message =
                    format!("failed to extract content for {}: {e:#}", path.display());
                return self.record_failure(&key, FailureKind::Scan, message);
            }
        };

        match self.store.insert_success(&key, content) {
            Ok(()) => {
                log::info!("Catalogued: {}", path.display());
                PathOutcome::Succeeded
            }
            Err(e) => {
                let message = format!("failed to write record for {}: {e}", path.display());
                self.record_failure(&key, FailureKind::Write, message)
            }
        }
    }

    fn record_failure(&self, key: &str, kind: FailureKind, message: String) -> PathOutcome {
        log::error!("{message}");
        if let Err(e) = self.store.insert_failure(key, kind, &message) {
            log::error!("failed to record {kind} failure for {key}: {e}");
        }
        PathOutcome::Failed(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeSet;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use catalist_core::ProjectId;
    use catalist_store::{Facet, Outcome};

    fn test_store(dir: &Path) -> ResultStore {
        let project = ProjectId::new("scan-test").unwrap();
        ResultStore::for_project(dir, &project).unwrap()
    }

    fn test_id() -> DatasetId {
        DatasetId::parse("proj.exp.rlds.v1").unwrap()
    }

    fn entry_for(id: &DatasetId, path: &Path) -> CatalogEntry {
        CatalogEntry {
            ds_id: id.to_string(),
            path: path.to_string_lossy().into_owned(),
            size: 100,
            facets: vec![Facet {
                name: "version".into(),
                value: "v1".into(),
            }],
            start_time: None,
            end_time: None,
            bbox: String::new(),
            level: String::new(),
        }
    }

    struct FixedLister(Vec<PathBuf>);

    impl FileLister for FixedLister {
        fn files(&self, _id: &DatasetId) -> Result<Vec<PathBuf>> {
            Ok(self.0.clone())
        }
    }

    /// Extractor that fails for configured paths and counts every call.
    struct ScriptedExtractor {
        fail: BTreeSet<PathBuf>,
        calls: AtomicUsize,
    }

    impl ScriptedExtractor {
        fn ok() -> Self {
            Self::failing(&[])
        }

        fn failing(paths: &[&str]) -> Self {
            Self {
                fail: paths.iter().map(PathBuf::from).collect(),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Extractor for ScriptedExtractor {
        fn extract(&self, id: &DatasetId, path: &Path) -> Result<CatalogEntry> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.contains(path) {
                anyhow::bail!("synthetic extraction failure");
            }
            Ok(entry_for(id, path))
        }
    }

    /// Sink that fails the first N `insert_success` calls, delegating the
    /// rest to a real store.
    struct FlakySink<'a> {
        inner: &'a ResultStore,
        fail_success_inserts: AtomicUsize,
    }

    impl RecordSink for FlakySink<'_> {
        fn status(&self, path: &str) -> RecordStatus {
            self.inner.status(path)
        }

        fn delete(&self, path: &str) -> Result<(), StoreError> {
            self.inner.delete(path)
        }

        fn insert_success(&self, path: &str, content: CatalogEntry) -> Result<(), StoreError> {
            if self
                .fail_success_inserts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(StoreError::Io(std::io::Error::other("injected write fault")));
            }
            self.inner.insert_success(path, content)
        }

        fn insert_failure(
            &self,
            path: &str,
            kind: FailureKind,
            message: &str,
        ) -> Result<(), StoreError> {
            self.inner.insert_failure(path, kind, message)
        }
    }

    #[test]
    fn fresh_scan_records_all() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path());
        let lister = FixedLister(vec!["/arch/f1.nc".into(), "/arch/f2.nc".into()]);
        let extractor = ScriptedExtractor::ok();

        let scanner = Scanner::new(&store, &lister, &extractor, false);
        let summary = scanner.scan(&test_id()).unwrap();

        assert_eq!(summary.files, 2);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 0);
        assert!(store.has_succeeded("/arch/f1.nc"));
        assert!(store.has_succeeded("/arch/f2.nc"));
    }

    #[test]
    fn rescan_skips_without_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path());
        let lister = FixedLister(vec!["/arch/f1.nc".into(), "/arch/f2.nc".into()]);
        let extractor = ScriptedExtractor::ok();

        let scanner = Scanner::new(&store, &lister, &extractor, false);
        scanner.scan(&test_id()).unwrap();
        assert_eq!(extractor.call_count(), 2);

        let summary = scanner.scan(&test_id()).unwrap();
        // Idempotence: zero extractor calls the second time around
        assert_eq!(extractor.call_count(), 2);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.succeeded, 0);
    }

    #[test]
    fn failure_retried_on_next_scan() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path());
        let lister = FixedLister(vec!["/arch/f1.nc".into()]);

        let failing = ScriptedExtractor::failing(&["/arch/f1.nc"]);
        Scanner::new(&store, &lister, &failing, false)
            .scan(&test_id())
            .unwrap();
        assert_eq!(store.count_failures().unwrap(), 1);

        // Next scan retries; extraction now succeeds
        let healthy = ScriptedExtractor::ok();
        let summary = Scanner::new(&store, &lister, &healthy, false)
            .scan(&test_id())
            .unwrap();
        assert_eq!(healthy.call_count(), 1);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(store.count_failures().unwrap(), 0);
        assert!(store.has_succeeded("/arch/f1.nc"));
    }

    #[test]
    fn repeated_failure_keeps_single_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path());
        let lister = FixedLister(vec!["/arch/f1.nc".into()]);
        let extractor = ScriptedExtractor::failing(&["/arch/f1.nc"]);

        let scanner = Scanner::new(&store, &lister, &extractor, false);
        scanner.scan(&test_id()).unwrap();
        scanner.scan(&test_id()).unwrap();

        assert_eq!(extractor.call_count(), 2);
        assert_eq!(store.count_failures().unwrap(), 1);
    }

    #[test]
    fn force_reprocesses_successful_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path());
        let lister = FixedLister(vec!["/arch/f1.nc".into()]);

        let extractor = ScriptedExtractor::ok();
        Scanner::new(&store, &lister, &extractor, false)
            .scan(&test_id())
            .unwrap();
        assert_eq!(extractor.call_count(), 1);

        let summary = Scanner::new(&store, &lister, &extractor, true)
            .scan(&test_id())
            .unwrap();
        assert_eq!(extractor.call_count(), 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.skipped, 0);
    }

    #[test]
    fn one_bad_file_does_not_abort_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path());
        let lister = FixedLister(vec![
            "/arch/f1.nc".into(),
            "/arch/f2.nc".into(),
            "/arch/f3.nc".into(),
        ]);
        let extractor = ScriptedExtractor::failing(&["/arch/f2.nc"]);

        let summary = Scanner::new(&store, &lister, &extractor, false)
            .scan(&test_id())
            .unwrap();

        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(store.count_failures().unwrap(), 1);

        let failures = store.failures().unwrap();
        match &failures[0].outcome {
            Outcome::Failure {
                error_kind,
                message,
            } => {
                assert_eq!(*error_kind, FailureKind::Scan);
                assert!(message.contains("synthetic extraction failure"));
            }
            other => panic!("expected failure outcome, got {other:?}"),
        }
    }

    #[test]
    fn write_failure_classified_as_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path());
        let sink = FlakySink {
            inner: &store,
            fail_success_inserts: AtomicUsize::new(1),
        };
        let lister = FixedLister(vec!["/arch/f1.nc".into()]);
        let extractor = ScriptedExtractor::ok();

        let summary = Scanner::new(&sink, &lister, &extractor, false)
            .scan(&test_id())
            .unwrap();

        // Extraction succeeded but the insert did not: kind must be write
        assert_eq!(extractor.call_count(), 1);
        assert_eq!(summary.failed, 1);
        let failures = store.failures().unwrap();
        assert_eq!(failures.len(), 1);
        match &failures[0].outcome {
            Outcome::Failure { error_kind, .. } => {
                assert_eq!(*error_kind, FailureKind::Write)
            }
            other => panic!("expected failure outcome, got {other:?}"),
        }

        // And the ordinary retry path recovers it on the next scan
        let summary = Scanner::new(&sink, &lister, &extractor, false)
            .scan(&test_id())
            .unwrap();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(store.count_failures().unwrap(), 0);
    }

    #[test]
    fn empty_dataset_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path());
        let lister = FixedLister(vec![]);
        let extractor = ScriptedExtractor::ok();

        let summary = Scanner::new(&store, &lister, &extractor, false)
            .scan(&test_id())
            .unwrap();
        assert_eq!(summary.files, 0);
    }
}
