//! Migration report
//!
//! Accumulated table by table during a run and handed back to the caller once
//! the run is over.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::connection::DatabaseRole;
use crate::migrate::decision::InsertionFailure;
use crate::schema::diff::TableMigrationPlan;

/// Columns that differ between a source table and its reference definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDiscrepancy {
    /// Data in these columns is not migrated
    pub source_only_columns: IndexSet<String>,
    /// These columns receive their default or NULL
    pub target_only_columns: IndexSet<String>,
}

/// What happened to one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableOutcome {
    Migrated { rows: u64 },
    /// Rows a dry run would copy
    Planned { rows: u64 },
    Empty,
    Missing { database: DatabaseRole },
    NoCommonColumns,
    Failed(InsertionFailure),
}

/// Per-table discrepancies and outcomes of a migration run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub discrepancies: IndexMap<String, ColumnDiscrepancy>,
    pub outcomes: IndexMap<String, TableOutcome>,
}

impl MigrationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the discrepancies of `plan`, if it has any
    pub fn record_plan(&mut self, plan: &TableMigrationPlan) {
        if plan.has_discrepancies() {
            self.discrepancies.insert(
                plan.table_name.clone(),
                ColumnDiscrepancy {
                    source_only_columns: plan.source_only_columns.clone(),
                    target_only_columns: plan.target_only_columns.clone(),
                },
            );
        }
    }

    pub fn record_outcome(&mut self, table: &str, outcome: TableOutcome) {
        self.outcomes.insert(table.to_string(), outcome);
    }

    /// Total rows copied across all tables
    pub fn migrated_rows(&self) -> u64 {
        self.outcomes
            .values()
            .map(|o| match o {
                TableOutcome::Migrated { rows } => *rows,
                _ => 0,
            })
            .sum()
    }

    /// Tables whose insert failed and were skipped by operator choice
    pub fn failures(&self) -> impl Iterator<Item = &InsertionFailure> {
        self.outcomes.values().filter_map(|o| match o {
            TableOutcome::Failed(failure) => Some(failure),
            _ => None,
        })
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for TableOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableOutcome::Migrated { rows } => write!(f, "migrated {} rows", rows),
            TableOutcome::Planned { rows } => write!(f, "would migrate {} rows", rows),
            TableOutcome::Empty => write!(f, "no data"),
            TableOutcome::Missing { database } => write!(f, "missing from the {} database", database),
            TableOutcome::NoCommonColumns => write!(f, "no columns in common"),
            TableOutcome::Failed(failure) => write!(f, "failed: {}", failure.error),
        }
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Migration Summary ===")?;
        for (table, outcome) in &self.outcomes {
            writeln!(f, "  {}: {}", table, outcome)?;
        }

        if self.discrepancies.is_empty() {
            return Ok(());
        }

        writeln!(f)?;
        writeln!(f, "=== Column Compatibility Summary ===")?;
        for (table, discrepancy) in &self.discrepancies {
            writeln!(f)?;
            writeln!(f, "Table: {}", table)?;
            if !discrepancy.source_only_columns.is_empty() {
                writeln!(f, "  Columns in source but missing in target (data not migrated):")?;
                for column in &discrepancy.source_only_columns {
                    writeln!(f, "    - {}", column)?;
                }
            }
            if !discrepancy.target_only_columns.is_empty() {
                writeln!(f, "  Columns in target but missing in source (will have default/NULL values):")?;
                for column in &discrepancy.target_only_columns {
                    writeln!(f, "    - {}", column)?;
                }
            }
        }
        Ok(())
    }
}
