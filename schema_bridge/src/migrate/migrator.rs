//! Row migration across a schema boundary
//!
//! Tables are migrated strictly in the given order. All inserts share one
//! transaction on the target which is committed once at the end of the run.
//! Each table gets its own savepoint so a rejected table leaves no partial
//! rows behind.

use futures::TryStreamExt;
use sqlx::sqlite::SqliteConnection;
use sqlx::Connection;

use crate::db::connection::{Database, DatabaseRole};
use crate::error::{Error, Result};
use crate::migrate::decision::{Decision, InsertionDecider, InsertionFailure};
use crate::migrate::report::{MigrationReport, TableOutcome};
use crate::schema::analyzer::{columns_of, row_count, table_exists};
use crate::schema::diff::TableMigrationPlan;
use crate::schema::types::SqlValue;

/// Result of copying one table inside its savepoint
enum CopyOutcome {
    Copied(u64),
    Rejected(sqlx::Error),
}

/// Migrate the rows of every table in `table_order` from `source` into
/// `target`, keeping only the columns `reference` also defines.
///
/// Returns [`Error::MigrationAborted`] when `decider` declines to continue
/// after a failed table; the whole run is rolled back in that case.
pub async fn migrate_data(
    source: &mut Database,
    reference: &mut Database,
    target: &mut Database,
    table_order: &[String],
    decider: &mut dyn InsertionDecider,
) -> Result<MigrationReport> {
    let mut report = MigrationReport::new();
    let mut tx = target.connection().begin().await?;

    for table in table_order {
        tracing::info!(table = %table, "Migrating table");

        let missing = missing_from(source.connection(), reference.connection(), &mut tx, table).await?;
        if let Some(role) = missing {
            tracing::info!(table = %table, database = %role, "Table does not exist, skipping");
            report.record_outcome(table, TableOutcome::Missing { database: role });
            continue;
        }

        let plan = plan_table(source.connection(), reference.connection(), table).await?;
        report.record_plan(&plan);

        if row_count(source.connection(), table).await? == 0 {
            tracing::info!(table = %table, "No data, skipping");
            report.record_outcome(table, TableOutcome::Empty);
            continue;
        }

        if plan.common_columns.is_empty() {
            tracing::warn!(table = %table, "No columns in common, skipping");
            report.record_outcome(table, TableOutcome::NoCommonColumns);
            continue;
        }

        let mut savepoint = tx.begin().await?;
        let outcome = copy_rows(source.connection(), &mut savepoint, &plan).await?;
        match outcome {
            CopyOutcome::Copied(rows) => {
                savepoint.commit().await?;
                tracing::info!(table = %table, rows, "Migrated rows");
                report.record_outcome(table, TableOutcome::Migrated { rows });
            }
            CopyOutcome::Rejected(err) => {
                savepoint.rollback().await?;

                let failure = InsertionFailure {
                    table: table.clone(),
                    statement: plan.insert_statement(),
                    error: err.to_string(),
                };
                tracing::error!(
                    table = %table,
                    statement = %failure.statement,
                    error = %failure.error,
                    "Error migrating table"
                );

                match decider.decide(&failure) {
                    Decision::Continue => report.record_outcome(table, TableOutcome::Failed(failure)),
                    Decision::Abort => {
                        tx.rollback().await?;
                        tracing::error!(table = %table, "Migration aborted, target rolled back");
                        return Err(Error::MigrationAborted { table: table.clone() });
                    }
                }
            }
        }
    }

    tx.commit().await?;
    tracing::info!(rows = report.migrated_rows(), "Changes committed to target database");

    Ok(report)
}

/// Compute plans for every table without writing anything.
///
/// Tables missing from either side are recorded as such.
pub async fn plan_tables(
    source: &mut Database,
    reference: &mut Database,
    table_order: &[String],
) -> Result<MigrationReport> {
    let mut report = MigrationReport::new();

    for table in table_order {
        let role = if !table_exists(source.connection(), table).await? {
            Some(DatabaseRole::Source)
        } else if !table_exists(reference.connection(), table).await? {
            Some(DatabaseRole::Reference)
        } else {
            None
        };
        if let Some(role) = role {
            report.record_outcome(table, TableOutcome::Missing { database: role });
            continue;
        }

        let plan = plan_table(source.connection(), reference.connection(), table).await?;
        report.record_plan(&plan);

        let outcome = if plan.common_columns.is_empty() {
            TableOutcome::NoCommonColumns
        } else {
            match row_count(source.connection(), table).await? {
                0 => TableOutcome::Empty,
                rows => TableOutcome::Planned { rows: rows as u64 },
            }
        };
        report.record_outcome(table, outcome);
    }

    Ok(report)
}

/// Build the column plan for `table`, warning about each discrepancy
async fn plan_table(
    source: &mut SqliteConnection,
    reference: &mut SqliteConnection,
    table: &str,
) -> Result<TableMigrationPlan> {
    let source_columns = columns_of(source, table).await?;
    let reference_columns = columns_of(reference, table).await?;
    let plan = TableMigrationPlan::compute(table, &source_columns, &reference_columns);

    if !plan.source_only_columns.is_empty() {
        tracing::warn!(
            table = %table,
            columns = %join(&plan.source_only_columns),
            "Columns in source but missing in target"
        );
    }
    if !plan.target_only_columns.is_empty() {
        tracing::warn!(
            table = %table,
            columns = %join(&plan.target_only_columns),
            "Columns in target but missing in source"
        );
    }

    Ok(plan)
}

/// The first database, in source/reference/target order, lacking `table`
async fn missing_from(
    source: &mut SqliteConnection,
    reference: &mut SqliteConnection,
    target: &mut SqliteConnection,
    table: &str,
) -> Result<Option<DatabaseRole>> {
    if !table_exists(source, table).await? {
        return Ok(Some(DatabaseRole::Source));
    }
    if !table_exists(reference, table).await? {
        return Ok(Some(DatabaseRole::Reference));
    }
    if !table_exists(target, table).await? {
        return Ok(Some(DatabaseRole::Target));
    }
    Ok(None)
}

/// Stream every source row through the plan into the target.
///
/// Read errors on the source are fatal; an insert error is reported back as
/// [`CopyOutcome::Rejected`] for the caller to decide on.
async fn copy_rows(
    source: &mut SqliteConnection,
    target: &mut SqliteConnection,
    plan: &TableMigrationPlan,
) -> Result<CopyOutcome> {
    let select = plan.select_statement();
    let insert = plan.insert_statement();
    let width = plan.source_columns.len();

    let mut rows = sqlx::query(&select).fetch(&mut *source);
    let mut copied = 0;

    while let Some(row) = rows.try_next().await? {
        let values = (0..width)
            .map(|index| SqlValue::decode(&row, index))
            .collect::<Result<Vec<_>>>()?;

        let query = plan
            .project(&values)
            .into_iter()
            .fold(sqlx::query(&insert), |query, value| value.bind_to(query));

        if let Err(err) = query.execute(&mut *target).await {
            return Ok(CopyOutcome::Rejected(err));
        }
        copied += 1;
    }

    Ok(CopyOutcome::Copied(copied))
}

fn join<'a>(columns: impl IntoIterator<Item = &'a String>) -> String {
    columns
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
