use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use schema_bridge::config::{self, Config, ErrorPolicy};
use schema_bridge::migrate::decider_for;
use schema_bridge::utils::init_logging;
use schema_bridge::MigrationRun;

/// Clone a reference SQLite schema and migrate rows into it from a diverged source
#[derive(Debug, Parser)]
#[command(name = "schema_bridge", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database whose rows are migrated
    #[arg(long, global = true)]
    source: Option<PathBuf>,

    /// Database whose schema the output copies
    #[arg(long, global = true)]
    reference: Option<PathBuf>,

    /// Path of the new database (replaced if it exists)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Directory receiving backups of both inputs
    #[arg(long, global = true)]
    backup_dir: Option<PathBuf>,

    /// Skip backing up the input databases
    #[arg(long, global = true)]
    no_backup: bool,

    /// Tables to migrate, in dependency order
    #[arg(long, global = true, value_delimiter = ',')]
    tables: Option<Vec<String>>,

    /// What to do when a table's rows cannot be inserted
    #[arg(long, global = true, value_enum)]
    on_error: Option<ErrorPolicy>,

    /// Write the migration report as JSON to this file
    #[arg(long, global = true)]
    report_json: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Back up, clone the reference structure and migrate rows (default)
    Migrate,
    /// Only recreate the reference structure at the output path
    CloneStructure,
    /// Show per-table column differences without writing anything
    Plan,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => config::load_from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(source) = &self.source {
            config.databases.source = source.clone();
        }
        if let Some(reference) = &self.reference {
            config.databases.reference = reference.clone();
        }
        if let Some(output) = &self.output {
            config.databases.output = output.clone();
        }
        if let Some(dir) = &self.backup_dir {
            config.backup.directory = dir.clone();
        }
        if self.no_backup {
            config.backup.enabled = false;
        }
        if let Some(tables) = &self.tables {
            config.migration.tables = tables.clone();
        }
        if let Some(policy) = self.on_error {
            config.migration.on_error = policy;
        }
        if let Some(path) = &self.report_json {
            config.migration.report_file = Some(path.clone());
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }

        Ok(config)
    }
}

/// Runs the selected command. `preserved` is set to the backup directory once
/// both inputs have been backed up.
async fn execute(cli: Cli, preserved: &mut Option<PathBuf>) -> anyhow::Result<()> {
    let config = cli.load_config()?;
    init_logging(&config.logging)?;

    let run = MigrationRun::new(config)?;
    match cli.command.unwrap_or(Command::Migrate) {
        Command::Migrate => {
            tracing::info!("Starting database migration");
            let mut decider = decider_for(run.config().migration.on_error);

            let backups = if run.config().backup.enabled {
                let backups = run.backup()?;
                *preserved = Some(run.config().backup.directory.clone());
                backups
            } else {
                Vec::new()
            };
            run.clone_structure().await?;
            let report = run.migrate(decider.as_mut()).await?;

            println!();
            println!("{}", report);
            println!("Migration completed successfully!");
            println!("New database created at: {}", run.config().databases.output.display());
            for backup in &backups {
                println!("Original database backed up to: {}", backup.display());
            }
        }
        Command::CloneStructure => {
            let summary = run.clone_structure().await?;
            println!(
                "Cloned {} tables, {} indices, {} triggers, {} views into {}",
                summary.tables.len(),
                summary.indices,
                summary.triggers,
                summary.views,
                run.config().databases.output.display()
            );
            for skipped in &summary.skipped {
                println!("  Skipped {} {}: {}", skipped.kind, skipped.name, skipped.error);
            }
        }
        Command::Plan => {
            let report = run.plan().await?;
            println!("{}", report);
        }
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut preserved = None;

    match execute(cli, &mut preserved).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\nAn error occurred: {:#}", e);
            eprintln!("{}", failure_message(preserved.as_deref()));
            ExitCode::FAILURE
        }
    }
}

fn failure_message(preserved: Option<&Path>) -> String {
    match preserved {
        Some(dir) => format!(
            "Migration failed. Your original databases are preserved in {}.",
            dir.display()
        ),
        None => "Migration failed.".to_string(),
    }
}
