//! `catalist batch` - partition the dataset manifest into batch files

use anyhow::Result;
use clap::Args;

use catalist_core::{Config, ProjectId};
use catalist_scan::BatchPlanner;

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Project name from the configuration
    pub project: String,

    /// Override the configured datasets-per-batch
    #[arg(long)]
    pub n_per_batch: Option<usize>,
}

pub fn run(args: BatchArgs, config: &Config) -> Result<()> {
    let project = ProjectId::new(&args.project)?;
    let project_config = config.project(&args.project)?;
    let n_per_batch = args.n_per_batch.unwrap_or(config.workflow.n_per_batch);

    let planner = BatchPlanner::new(&project, project_config, n_per_batch);
    let count = planner.create_batches()?;

    println!("{count} batches in {}", planner.batches_dir().display());
    Ok(())
}
