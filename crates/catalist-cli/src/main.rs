//! catalist - build searchable catalogs of scientific dataset archives
//!
//! Partitions a project's dataset list into batches, scans each dataset's
//! files into a resumable result store, and exports the successful records
//! as a compressed CSV catalog with a shared YAML index.

use std::io::IsTerminal;

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::MultiProgress;

mod cmd;

use catalist_core::Config;

#[derive(Parser)]
#[command(name = "catalist")]
#[command(about = "Build searchable catalogs of scientific dataset archives")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./catalist.toml or ~/.config/catalist/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Partition a project's dataset manifest into batches
    Batch(cmd::batch::BatchArgs),
    /// Scan batches, recording per-file outcomes in the result store
    Scan(cmd::scan::ScanArgs),
    /// Export successful records to CSV and update the catalog index
    Export(cmd::export::ExportArgs),
    /// Show success/failure counts and failure diagnostics
    Status(cmd::status::StatusArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging:
    //   TTY:     quiet (warn) unless --debug  — progress bars show activity
    //   non-TTY: info unless --debug          — logs are the only progress indicator
    let is_tty = std::io::stderr().is_terminal();
    let multi = is_tty.then(MultiProgress::new);
    let quiet = is_tty && !cli.debug;
    catalist_core::init_logging(quiet, cli.debug, multi.as_ref());

    // Load configuration
    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Batch(args) => cmd::batch::run(args, &config),
        Command::Scan(args) => cmd::scan::run(args, &config, multi),
        Command::Export(args) => cmd::export::run(args, &config),
        Command::Status(args) => cmd::status::run(args, &config),
        Command::Config => {
            use comfy_table::{
                modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec![
                "n_per_batch".to_string(),
                config.workflow.n_per_batch.to_string(),
            ]);
            for (name, project) in &config.project {
                table.add_row(vec![
                    format!("[{name}] base_dir"),
                    project.base_dir.display().to_string(),
                ]);
                table.add_row(vec![
                    format!("[{name}] catalog_dir"),
                    project.catalog_dir.display().to_string(),
                ]);
                table.add_row(vec![
                    format!("[{name}] csv_dir"),
                    project.csv_dir.display().to_string(),
                ]);
                table.add_row(vec![
                    format!("[{name}] datasets_file"),
                    project.datasets_file.display().to_string(),
                ]);
                table.add_row(vec![
                    format!("[{name}] facet_rule"),
                    project.facet_rule.join(" "),
                ]);
            }

            eprintln!("\n{table}");
            Ok(())
        }
    }
}
