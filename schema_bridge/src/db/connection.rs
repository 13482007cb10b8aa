//! Database connection handling
//!
//! Each run opens one dedicated SQLite connection per database. Inputs are
//! opened read-only so they can never be modified in place.

use std::fmt;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode};
use sqlx::{ConnectOptions, Connection};

use crate::error::{Error, Result};

/// The part a database plays in a migration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseRole {
    Source,
    Reference,
    Target,
}

impl fmt::Display for DatabaseRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseRole::Source => write!(f, "source"),
            DatabaseRole::Reference => write!(f, "reference"),
            DatabaseRole::Target => write!(f, "target"),
        }
    }
}

/// An exclusively owned connection to one SQLite database file
#[derive(Debug)]
pub struct Database {
    conn: SqliteConnection,
    path: PathBuf,
    role: DatabaseRole,
}

impl Database {
    /// Open an existing database without write access
    pub async fn open_read_only(path: impl AsRef<Path>, role: DatabaseRole) -> Result<Self> {
        let path = path.as_ref();
        ensure_exists(path, role)?;

        let options = base_options(path).read_only(true);
        Self::connect(options, path, role).await
    }

    /// Create the target database file, or open it if it is already there
    pub async fn create(path: impl AsRef<Path>, foreign_keys: bool) -> Result<Self> {
        let path = path.as_ref();
        let options = base_options(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Delete)
            .foreign_keys(foreign_keys);
        Self::connect(options, path, DatabaseRole::Target).await
    }

    /// Open an existing target database for writing
    pub async fn open_target(path: impl AsRef<Path>, foreign_keys: bool) -> Result<Self> {
        let path = path.as_ref();
        ensure_exists(path, DatabaseRole::Target)?;

        let options = base_options(path).foreign_keys(foreign_keys);
        Self::connect(options, path, DatabaseRole::Target).await
    }

    async fn connect(options: SqliteConnectOptions, path: &Path, role: DatabaseRole) -> Result<Self> {
        tracing::info!(role = %role, path = %path.display(), "Opening database");
        let conn = options.connect().await?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
            role,
        })
    }

    /// Borrow the underlying connection for queries
    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn role(&self) -> DatabaseRole {
        self.role
    }

    /// Execute a single SQL statement that takes no parameters
    pub async fn execute(&mut self, sql: &str) -> Result<()> {
        sqlx::query(sql).execute(&mut self.conn).await?;
        Ok(())
    }

    /// Close the connection, flushing any pending work
    pub async fn close(self) -> Result<()> {
        tracing::debug!(role = %self.role, path = %self.path.display(), "Closing database");
        self.conn.close().await?;
        Ok(())
    }
}

fn base_options(path: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(path)
        .log_statements(LevelFilter::Trace)
}

fn ensure_exists(path: &Path, role: DatabaseRole) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::DatabaseError(format!(
            "The {} database {} does not exist",
            role,
            path.display()
        )))
    }
}
