//! SchemaBridge: migrate rows between two diverged SQLite schemas
//!
//! SchemaBridge clones the structure of a reference database into a fresh file
//! and fills it with rows from a source database whose tables have drifted,
//! copying only the columns both sides share and reporting the rest.

pub mod config;
pub mod db;
pub mod error;
pub mod migrate;
pub mod schema;
pub mod utils;

use serde::Serialize;
use std::fs;
use std::path::PathBuf;

// Re-export main types for easier access
pub use config::Config;
pub use db::connection::{Database, DatabaseRole};
pub use error::{Error, Result};
pub use migrate::{InsertionDecider, MigrationReport};
pub use schema::{CloneSummary, TableMigrationPlan};

/// Everything a completed run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub backups: Vec<PathBuf>,
    pub clone: CloneSummary,
    pub report: MigrationReport,
}

/// One migration of a source database into a copy of a reference schema
pub struct MigrationRun {
    config: Config,
}

impl MigrationRun {
    /// Create a run from a validated configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Back up the source and reference databases
    pub fn backup(&self) -> Result<Vec<PathBuf>> {
        let backup = &self.config.backup;
        let databases = &self.config.databases;

        let reference = db::backup_database(&databases.reference, &backup.reference_label, &backup.directory)?;
        let source = db::backup_database(&databases.source, &backup.source_label, &backup.directory)?;
        Ok(vec![reference, source])
    }

    /// Recreate the reference database's structure at the output path
    pub async fn clone_structure(&self) -> Result<CloneSummary> {
        // the output is deleted below, recheck it against both inputs as they are now
        self.config.validate()?;
        let mut reference = Database::open_read_only(&self.config.databases.reference, DatabaseRole::Reference).await?;
        let result = schema::clone_structure(&mut reference, &self.config.databases.output).await;
        close_quietly(reference).await;
        result
    }

    /// Report what a migration would do, without writing anything
    pub async fn plan(&self) -> Result<MigrationReport> {
        let databases = &self.config.databases;
        let mut source = Database::open_read_only(&databases.source, DatabaseRole::Source).await?;
        let mut reference = match Database::open_read_only(&databases.reference, DatabaseRole::Reference).await {
            Ok(db) => db,
            Err(e) => {
                close_quietly(source).await;
                return Err(e);
            }
        };

        let result = migrate::plan_tables(&mut source, &mut reference, &self.config.migration.tables).await;
        close_quietly(source).await;
        close_quietly(reference).await;
        result
    }

    /// Migrate rows into the already cloned output database
    pub async fn migrate(&self, decider: &mut dyn InsertionDecider) -> Result<MigrationReport> {
        let databases = &self.config.databases;
        let migration = &self.config.migration;
        self.config.validate()?;

        let mut source = Database::open_read_only(&databases.source, DatabaseRole::Source).await?;
        let mut reference = match Database::open_read_only(&databases.reference, DatabaseRole::Reference).await {
            Ok(db) => db,
            Err(e) => {
                close_quietly(source).await;
                return Err(e);
            }
        };
        let mut target = match Database::open_target(&databases.output, migration.enforce_foreign_keys).await {
            Ok(db) => db,
            Err(e) => {
                close_quietly(source).await;
                close_quietly(reference).await;
                return Err(e);
            }
        };

        let result = migrate::migrate_data(
            &mut source,
            &mut reference,
            &mut target,
            &migration.tables,
            decider,
        )
        .await;

        close_quietly(source).await;
        close_quietly(reference).await;
        close_quietly(target).await;

        let report = result?;
        if let Some(path) = &migration.report_file {
            fs::write(path, report.to_json()?)?;
            tracing::info!(path = %path.display(), "Migration report written");
        }
        Ok(report)
    }

    /// Complete workflow: back up inputs, clone the structure, migrate rows
    pub async fn run(&self, decider: &mut dyn InsertionDecider) -> Result<RunSummary> {
        let backups = if self.config.backup.enabled {
            self.backup()?
        } else {
            Vec::new()
        };

        let clone = self.clone_structure().await?;
        let report = self.migrate(decider).await?;

        Ok(RunSummary { backups, clone, report })
    }
}

async fn close_quietly(db: Database) {
    let role = db.role();
    if let Err(e) = db.close().await {
        tracing::warn!(role = %role, error = %e, "Failed to close database");
    }
}
