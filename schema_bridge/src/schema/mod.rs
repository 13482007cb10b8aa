//! Schema module for SchemaBridge
//!
//! This module handles catalog introspection, structure cloning and column
//! reconciliation.

pub mod analyzer;
pub mod cloner;
pub mod diff;
pub mod types;

// Re-export key types
pub use cloner::{clone_structure, AuxiliaryObjectWarning, CloneSummary};
pub use diff::TableMigrationPlan;
pub use types::{ColumnDescriptor, ObjectKind, SchemaObject, SqlValue};
