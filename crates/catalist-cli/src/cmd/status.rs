//! `catalist status` - operator view of the result store

use anyhow::Result;
use clap::Args;

use catalist_core::{Config, ProjectId};
use catalist_store::{Outcome, ResultStore};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Project name from the configuration
    pub project: String,

    /// List failure diagnostics
    #[arg(long)]
    pub errors: bool,
}

pub fn run(args: StatusArgs, config: &Config) -> Result<()> {
    let project = ProjectId::new(&args.project)?;
    let project_config = config.project(&args.project)?;
    let store = ResultStore::for_project(&project_config.catalog_dir, &project)?;

    let files = store.successful_paths()?.len();
    let datasets = store.successful_dataset_ids()?.len();
    let failures = store.count_failures()?;
    println!("{project}: {files} files cataloged across {datasets} datasets, {failures} failures");

    if args.errors && failures > 0 {
        use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new("Path").fg(Color::Cyan),
                Cell::new("Kind").fg(Color::Cyan),
                Cell::new("Recorded").fg(Color::Cyan),
                Cell::new("Message").fg(Color::Cyan),
            ]);

        for record in store.failures()? {
            if let Outcome::Failure {
                error_kind,
                message,
            } = &record.outcome
            {
                // Diagnostics can span many lines; the table shows the first
                let first_line = message.lines().next().unwrap_or("").to_string();
                table.add_row(vec![
                    record.path.clone(),
                    error_kind.to_string(),
                    record.recorded_at.format("%Y-%m-%d %H:%M").to_string(),
                    first_line,
                ]);
            }
        }

        eprintln!("\n{table}");
    }

    Ok(())
}
