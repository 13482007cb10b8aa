//! Configuration handling for SchemaBridge

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::utils::paths::same_file;

/// Tables migrated when no explicit order is configured, dependencies first.
pub const DEFAULT_TABLE_ORDER: &[&str] = &[
    "media",
    "user",
    "issue",
    "issue_comment",
    "media_request",
    "season",
    "season_request",
    "user_settings",
    "user_push_subscription",
    "session",
    "watchlist",
    "discover_slider",
];

/// Load configuration from a TOML file
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
    let config_str = fs::read_to_string(path.as_ref())
        .map_err(|e| Error::ConfigError(format!("Failed to read config file: {}", e)))?;

    let config: Config = toml::from_str(&config_str)?;

    Ok(config)
}

/// Represents the complete SchemaBridge configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub databases: DatabasesConfig,
    pub backup: BackupConfig,
    pub migration: MigrationConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Check that the configured paths describe a migration that cannot
    /// touch the input files.
    ///
    /// Paths are compared after resolution, so this depends on the state of
    /// the filesystem at the time of the call.
    pub fn validate(&self) -> Result<()> {
        let db = &self.databases;
        if same_file(&db.output, &db.source) || same_file(&db.output, &db.reference) {
            return Err(Error::ConfigError(format!(
                "Output database {} must differ from both input databases",
                db.output.display()
            )));
        }
        if self.migration.tables.is_empty() {
            return Err(Error::ConfigError("No tables configured for migration".to_string()));
        }
        if self.backup.enabled && self.backup.source_label == self.backup.reference_label {
            return Err(Error::ConfigError(format!(
                "Backup labels must be distinct, both are `{}`",
                self.backup.source_label
            )));
        }
        Ok(())
    }
}

/// Locations of the three databases taking part in a run
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DatabasesConfig {
    /// Database whose rows are migrated
    pub source: PathBuf,
    /// Database whose schema the output is cloned from
    pub reference: PathBuf,
    /// Freshly created database receiving the migrated rows
    pub output: PathBuf,
}

impl Default for DatabasesConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("./overseerr/db.sqlite3"),
            reference: PathBuf::from("./jellyseerr/db.sqlite3"),
            output: PathBuf::from("./newjelly_db.sqlite3"),
        }
    }
}

/// Backup settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct BackupConfig {
    pub enabled: bool,
    pub directory: PathBuf,
    pub source_label: String,
    pub reference_label: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: PathBuf::from("./backups"),
            source_label: "source_original".to_string(),
            reference_label: "reference_original".to_string(),
        }
    }
}

/// What to do when inserting a table's rows fails
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Ask the operator on the terminal
    #[default]
    Prompt,
    /// Stop the run at the first failing table
    Abort,
    /// Record the failure and move on to the next table
    Continue,
}

/// Row migration settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct MigrationConfig {
    /// Tables to migrate, in dependency order
    pub tables: Vec<String>,
    pub on_error: ErrorPolicy,
    /// Enforce foreign keys on the target while rows are inserted
    pub enforce_foreign_keys: bool,
    /// Optional path where the report is written as JSON
    pub report_file: Option<PathBuf>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            tables: DEFAULT_TABLE_ORDER.iter().map(|t| t.to_string()).collect(),
            on_error: ErrorPolicy::Prompt,
            enforce_foreign_keys: false,
            report_file: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub format: String,
    pub stdout: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            format: "text".to_string(),
            stdout: true,
        }
    }
}
