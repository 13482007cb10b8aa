//! Error types for SchemaBridge

use thiserror::Error;

/// Result type for SchemaBridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for SchemaBridge
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    /// The introspected table does not exist in the database
    #[error("Schema error: table `{0}` does not exist")]
    SchemaError(String),

    /// A base table could not be recreated, so the cloned database is unusable
    #[error("Failed to create table `{table}`: {source}")]
    StructuralCreationError {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    /// The operator declined to continue after an insertion failure
    #[error("Migration aborted at table `{table}`")]
    MigrationAborted { table: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Convert Serde JSON errors to SchemaBridge errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert TOML deserialization errors to SchemaBridge errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(format!("Failed to parse config file: {}", error))
    }
}
