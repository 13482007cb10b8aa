//! Structure cloning
//!
//! Recreates every table, index, trigger and view of a database in a fresh
//! file, replaying the stored creation statements verbatim and copying no rows.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteConnection;
use sqlx::Connection;
use std::fs;
use std::path::{Path, PathBuf};

use crate::db::connection::Database;
use crate::error::{Error, Result};
use crate::schema::analyzer::{catalog_objects, is_internal_table, shadow_tables};
use crate::schema::types::{ObjectKind, SchemaObject};
use crate::utils::paths::same_file;

/// An index, trigger or view that could not be recreated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxiliaryObjectWarning {
    pub kind: ObjectKind,
    pub name: String,
    pub error: String,
}

/// Outcome of a structure clone
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloneSummary {
    pub tables: Vec<String>,
    pub indices: usize,
    pub triggers: usize,
    pub views: usize,
    pub skipped: Vec<AuxiliaryObjectWarning>,
}

/// Clone the structure of `source` into a new database at `target_path`.
///
/// Any file already at `target_path` is deleted first, unless it is the
/// source database itself. A table that cannot be
/// created aborts the clone; auxiliary objects that fail are logged, skipped
/// and listed in the summary.
pub async fn clone_structure(source: &mut Database, target_path: &Path) -> Result<CloneSummary> {
    tracing::info!(
        source = %source.path().display(),
        target = %target_path.display(),
        "Creating new database structure"
    );

    if same_file(source.path(), target_path) {
        return Err(Error::DatabaseError(format!(
            "Refusing to clone {} onto itself",
            source.path().display()
        )));
    }

    remove_existing(target_path)?;
    let mut target = Database::create(target_path, false).await?;

    let result = replay_structure(source.connection(), target.connection()).await;
    let closed = target.close().await;
    let summary = result?;
    closed?;

    tracing::info!(
        target = %target_path.display(),
        tables = summary.tables.len(),
        skipped = summary.skipped.len(),
        "New database structure created"
    );
    Ok(summary)
}

async fn replay_structure(
    source: &mut SqliteConnection,
    target: &mut SqliteConnection,
) -> Result<CloneSummary> {
    let shadows = shadow_tables(&mut *source).await?;
    let tables: Vec<SchemaObject> = catalog_objects(&mut *source, ObjectKind::Table, None)
        .await?
        .into_iter()
        .filter(|t| !is_internal_table(&t.name) && !shadows.contains(&t.name))
        .collect();

    sqlx::query("PRAGMA foreign_keys = OFF").execute(&mut *target).await?;

    let mut summary = CloneSummary::default();
    let mut tx = target.begin().await?;

    for table in &tables {
        tracing::info!(table = %table.name, "Cloning table structure");
        if let Err(source_err) = sqlx::query(&table.definition_sql).execute(&mut *tx).await {
            tracing::error!(table = %table.name, sql = %table.definition_sql, "Table creation failed");
            tx.rollback().await?;
            return Err(Error::StructuralCreationError {
                table: table.name.clone(),
                source: source_err,
            });
        }
        summary.tables.push(table.name.clone());

        let indices = catalog_objects(&mut *source, ObjectKind::Index, Some(&table.name)).await?;
        let (created, skipped) = create_auxiliary_objects(&mut tx, &indices).await;
        summary.indices += created;
        summary.skipped.extend(skipped);
    }

    for kind in [ObjectKind::Trigger, ObjectKind::View] {
        let objects = catalog_objects(&mut *source, kind, None).await?;
        let (created, skipped) = create_auxiliary_objects(&mut tx, &objects).await;
        match kind {
            ObjectKind::Trigger => summary.triggers = created,
            _ => summary.views = created,
        }
        summary.skipped.extend(skipped);
    }

    tx.commit().await?;
    sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *target).await?;

    Ok(summary)
}

/// Replay index, trigger or view definitions against `conn`.
///
/// Failures do not stop the replay. Returns how many objects were created and
/// a warning for each one that was skipped.
pub async fn create_auxiliary_objects(
    conn: &mut SqliteConnection,
    objects: &[SchemaObject],
) -> (usize, Vec<AuxiliaryObjectWarning>) {
    let mut created = 0;
    let mut skipped = Vec::new();

    for object in objects {
        match sqlx::query(&object.definition_sql).execute(&mut *conn).await {
            Ok(_) => created += 1,
            Err(e) => {
                tracing::warn!(
                    kind = %object.kind,
                    name = %object.name,
                    error = %e,
                    "Could not create {}, skipping",
                    object.kind
                );
                skipped.push(AuxiliaryObjectWarning {
                    kind: object.kind,
                    name: object.name.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    (created, skipped)
}

/// Delete a database file along with its journal, WAL and shared-memory files
fn remove_existing(path: &Path) -> Result<()> {
    let mut candidates = vec![path.to_path_buf()];
    for suffix in ["-journal", "-wal", "-shm"] {
        let mut sidecar = path.as_os_str().to_owned();
        sidecar.push(suffix);
        candidates.push(PathBuf::from(sidecar));
    }

    for candidate in candidates.iter().filter(|p| p.exists()) {
        tracing::debug!(path = %candidate.display(), "Removing existing file");
        fs::remove_file(candidate)?;
    }
    Ok(())
}
