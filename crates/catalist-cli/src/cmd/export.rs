//! `catalist export` - materialize the catalog from successful records

use anyhow::Result;
use clap::Args;

use catalist_core::{Config, ProjectId};
use catalist_scan::{update_catalog, write_csv};
use catalist_store::ResultStore;

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Project name from the configuration
    pub project: String,
}

pub fn run(args: ExportArgs, config: &Config) -> Result<()> {
    let project = ProjectId::new(&args.project)?;
    let project_config = config.project(&args.project)?;

    let store = ResultStore::for_project(&project_config.catalog_dir, &project)?;
    let entries = store.all_content()?;
    if entries.is_empty() {
        log::warn!("no successful records for {project}; exporting empty catalog");
    }

    let (csv_path, stamp) = write_csv(&entries, &project, project_config)?;
    let index_path = update_catalog(&project, &csv_path, stamp, &project_config.catalog_dir)?;

    println!("{} rows -> {}", entries.len(), csv_path.display());
    println!("index updated: {}", index_path.display());
    Ok(())
}
