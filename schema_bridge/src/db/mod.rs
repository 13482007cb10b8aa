//! Database module for SchemaBridge
//!
//! This module handles database connections and backups.

pub mod backup;
pub mod connection;

// Re-export key types
pub use backup::backup_database;
pub use connection::{Database, DatabaseRole};
