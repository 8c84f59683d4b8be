//! Task execution: run scans for selected batches
//!
//! Every dataset identifier in every selected batch is handed to exactly
//! one `Scanner::scan` call. The runner never retries — retry is the
//! scanner's delete-and-reattempt policy, triggered only by a later run.

use std::sync::Mutex;
use std::time::Instant;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use catalist_core::{ConfigError, DatasetId, WorkQueue};

use crate::batch::BatchPlanner;
use crate::extract::{Extractor, FileLister};
use crate::scanner::{RecordSink, ScanSummary, Scanner};

/// How the datasets of the selected batches are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Sequential, in-process.
    Local,
    /// Worker pool; each dataset scan is claimed independently, so
    /// completion order across datasets is not preserved.
    Workers(usize),
}

/// Summary of one `run_tasks` call.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    pub datasets: usize,
    /// Datasets whose file listing failed outright (no per-file records).
    pub datasets_failed: usize,
    pub files: ScanSummary,
    pub elapsed: std::time::Duration,
}

impl RunSummary {
    fn record(&mut self, scan: Option<ScanSummary>) {
        self.datasets += 1;
        match scan {
            Some(summary) => self.files.merge(&summary),
            None => self.datasets_failed += 1,
        }
    }

    pub fn log(&self) {
        log::info!("=== Run Summary ===");
        log::info!(
            "Datasets: {}/{} completed ({} failed to list)",
            self.datasets - self.datasets_failed,
            self.datasets,
            self.datasets_failed
        );
        self.files.log();
        log::info!("Time: {:.1}s", self.elapsed.as_secs_f64());
    }
}

/// Executes the scans for one or more batches.
pub struct TaskRunner<'a, S, L, E> {
    scanner: &'a Scanner<'a, S, L, E>,
    planner: &'a BatchPlanner<'a>,
    mode: RunMode,
    progress: Option<MultiProgress>,
}

impl<'a, S, L, E> TaskRunner<'a, S, L, E>
where
    S: RecordSink + Sync,
    L: FileLister + Sync,
    E: Extractor + Sync,
{
    pub fn new(scanner: &'a Scanner<'a, S, L, E>, planner: &'a BatchPlanner<'a>, mode: RunMode) -> Self {
        Self {
            scanner,
            planner,
            mode,
            progress: None,
        }
    }

    /// Show an overall progress bar on the given MultiProgress.
    pub fn with_progress(mut self, multi: MultiProgress) -> Self {
        self.progress = Some(multi);
        self
    }

    /// Scan every dataset of the selected batches.
    ///
    /// Only batch loading can fail; a dataset whose scan errors is counted
    /// and logged, never fatal to its siblings.
    pub fn run_tasks(&self, batches: &[u32]) -> Result<RunSummary, ConfigError> {
        let start = Instant::now();

        let mut ids: Vec<DatasetId> = Vec::new();
        for &number in batches {
            ids.extend(self.planner.load_batch(number)?);
        }
        log::info!(
            "Running {} datasets from {} batches ({:?})",
            ids.len(),
            batches.len(),
            self.mode
        );

        let bar = self.progress.as_ref().map(|multi| {
            let pb = multi.add(ProgressBar::new(ids.len() as u64));
            pb.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} datasets ({eta})",
                )
                .unwrap()
                .progress_chars("=>-"),
            );
            pb
        });

        let mut summary = match self.mode {
            RunMode::Local => {
                let mut summary = RunSummary::default();
                for id in &ids {
                    summary.record(self.scan_one(id));
                    if let Some(pb) = &bar {
                        pb.inc(1);
                    }
                }
                summary
            }
            RunMode::Workers(workers) => {
                let queue = WorkQueue::new(ids);
                let summary = Mutex::new(RunSummary::default());

                rayon::scope(|s| {
                    for _ in 0..workers {
                        s.spawn(|_| {
                            while let Some(id) = queue.next() {
                                let scan = self.scan_one(id);
                                summary.lock().unwrap().record(scan);
                                if let Some(pb) = &bar {
                                    pb.inc(1);
                                }
                            }
                        });
                    }
                });

                summary.into_inner().unwrap()
            }
        };

        if let Some(pb) = &bar {
            pb.finish_with_message("done");
        }

        summary.elapsed = start.elapsed();
        summary.log();
        Ok(summary)
    }

    fn scan_one(&self, id: &DatasetId) -> Option<ScanSummary> {
        match self.scanner.scan(id) {
            Ok(summary) => Some(summary),
            Err(e) => {
                log::error!("dataset {id} failed: {e:#}");
                None
            }
        }
    }
}
