//! Row migration
//!
//! Copies table data across a schema boundary and reports what could not be
//! carried over.

pub mod decision;
pub mod migrator;
pub mod report;

pub use decision::{decider_for, Decision, FixedDecision, InsertionDecider, InsertionFailure, PromptDecider};
pub use migrator::{migrate_data, plan_tables};
pub use report::{ColumnDiscrepancy, MigrationReport, TableOutcome};
