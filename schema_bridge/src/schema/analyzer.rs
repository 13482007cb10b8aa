//! Database schema analyzer
//!
//! Catalog and column introspection for a single SQLite connection. Table
//! names are always passed as bound parameters, never spliced into SQL.

use sqlx::sqlite::SqliteConnection;
use sqlx::Row;

use crate::error::{Error, Result};
use crate::schema::types::{ColumnDescriptor, ObjectKind, SchemaObject};
use crate::utils::naming::quote_identifier;

/// Columns of `table` in declared order.
///
/// Fails with [`Error::SchemaError`] when the table does not exist. Generated
/// and hidden columns are not reported since they cannot be inserted into.
pub async fn columns_of(conn: &mut SqliteConnection, table: &str) -> Result<Vec<ColumnDescriptor>> {
    let sql = r#"SELECT cid, name, type, "notnull", dflt_value FROM pragma_table_info(?) ORDER BY cid"#;
    let rows = sqlx::query(sql).bind(table).fetch_all(&mut *conn).await?;

    if rows.is_empty() {
        return Err(Error::SchemaError(table.to_string()));
    }

    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        let notnull: i64 = row.try_get("notnull")?;
        columns.push(ColumnDescriptor {
            name: row.try_get("name")?,
            ordinal: row.try_get("cid")?,
            declared_type: row.try_get("type")?,
            not_null: notnull != 0,
            default_value: row.try_get("dflt_value")?,
        });
    }

    Ok(columns)
}

/// All catalog objects of `kind`, in catalog order.
///
/// `owner` restricts the result to objects attached to that table. Objects
/// without a definition (automatic indices) are left out since their table
/// recreates them.
pub async fn catalog_objects(
    conn: &mut SqliteConnection,
    kind: ObjectKind,
    owner: Option<&str>,
) -> Result<Vec<SchemaObject>> {
    let rows = match owner {
        Some(table) => {
            let sql = "SELECT type, name, tbl_name, sql FROM sqlite_master WHERE type = ? AND tbl_name = ?";
            sqlx::query(sql)
                .bind(kind.as_str())
                .bind(table)
                .fetch_all(&mut *conn)
                .await?
        }
        None => {
            let sql = "SELECT type, name, tbl_name, sql FROM sqlite_master WHERE type = ?";
            sqlx::query(sql)
                .bind(kind.as_str())
                .fetch_all(&mut *conn)
                .await?
        }
    };

    let mut objects = Vec::new();
    for row in rows {
        let definition: Option<String> = row.try_get("sql")?;
        let definition_sql = match definition {
            Some(sql) if !sql.trim().is_empty() => sql,
            _ => continue,
        };

        let kind_name: String = row.try_get("type")?;
        objects.push(SchemaObject {
            kind: kind_name.parse()?,
            name: row.try_get("name")?,
            owner_table: row.try_get("tbl_name")?,
            definition_sql,
        });
    }

    Ok(objects)
}

/// Whether a table named `table` exists
pub async fn table_exists(conn: &mut SqliteConnection, table: &str) -> Result<bool> {
    let found = sqlx::query("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?")
        .bind(table)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

/// Number of rows stored in `table`
pub async fn row_count(conn: &mut SqliteConnection, table: &str) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
    let count: i64 = sqlx::query_scalar(&sql).fetch_one(&mut *conn).await?;
    Ok(count)
}

/// Names of the shadow tables backing virtual tables
pub async fn shadow_tables(conn: &mut SqliteConnection) -> Result<Vec<String>> {
    let names = sqlx::query_scalar("SELECT name FROM pragma_table_list WHERE type = 'shadow'")
        .fetch_all(&mut *conn)
        .await?;
    Ok(names)
}

/// Tables maintained by SQLite itself, such as `sqlite_sequence`
pub fn is_internal_table(name: &str) -> bool {
    name.to_ascii_lowercase().starts_with("sqlite_")
}
