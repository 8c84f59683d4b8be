//! `catalist scan` - run the scans for selected batches

use anyhow::Result;
use clap::Args;
use indicatif::MultiProgress;

use catalist_core::{Config, ProjectId};
use catalist_scan::{ArchiveLister, BatchPlanner, FacetExtractor, RunMode, Scanner, TaskRunner};
use catalist_store::ResultStore;

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Project name from the configuration
    pub project: String,

    /// Batch numbers to run (e.g. --batches 1,2,5)
    #[arg(long, value_delimiter = ',')]
    pub batches: Vec<u32>,

    /// Run every existing batch
    #[arg(long, conflicts_with = "batches")]
    pub all: bool,

    /// Reprocess files that already have a record
    #[arg(long)]
    pub force: bool,

    /// Worker pool size; omit for sequential execution
    #[arg(short, long)]
    pub workers: Option<usize>,
}

pub fn run(args: ScanArgs, config: &Config, multi: Option<MultiProgress>) -> Result<()> {
    let project = ProjectId::new(&args.project)?;
    let project_config = config.project(&args.project)?;

    let planner = BatchPlanner::new(&project, project_config, config.workflow.n_per_batch);
    let batches = if args.all {
        planner.list_batches()?
    } else {
        args.batches.clone()
    };
    if batches.is_empty() {
        anyhow::bail!("no batches selected; use --batches or --all");
    }

    let store = ResultStore::for_project(&project_config.catalog_dir, &project)?;
    let lister = ArchiveLister::new(&project_config.base_dir);
    let extractor = FacetExtractor::new(&project_config.base_dir, &project_config.facet_rule);
    let scanner = Scanner::new(&store, &lister, &extractor, args.force);

    let mode = match args.workers {
        Some(workers) => RunMode::Workers(workers),
        None => RunMode::Local,
    };
    let mut runner = TaskRunner::new(&scanner, &planner, mode);
    if let Some(multi) = multi {
        runner = runner.with_progress(multi);
    }

    let summary = runner.run_tasks(&batches)?;
    println!(
        "{} datasets: {} files succeeded, {} skipped, {} failed",
        summary.datasets, summary.files.succeeded, summary.files.skipped, summary.files.failed
    );
    Ok(())
}
