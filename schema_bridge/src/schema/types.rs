//! Type definitions for database schema objects

use serde::{Deserialize, Serialize};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Row, TypeInfo, ValueRef};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// One column of a table, as declared in its creation statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub ordinal: i64,
    pub declared_type: String,
    pub not_null: bool,
    /// Default value expression, as written in the schema
    pub default_value: Option<String>,
}

impl ColumnDescriptor {
    /// Create a nullable column with no default
    pub fn new(name: &str, ordinal: i64, declared_type: &str) -> Self {
        Self {
            name: name.to_string(),
            ordinal,
            declared_type: declared_type.to_string(),
            not_null: false,
            default_value: None,
        }
    }
}

/// Kinds of objects stored in the schema catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Table,
    Index,
    Trigger,
    View,
}

impl ObjectKind {
    /// Name of the kind in the catalog's `type` column
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Table => "table",
            ObjectKind::Index => "index",
            ObjectKind::Trigger => "trigger",
            ObjectKind::View => "view",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "table" => Ok(ObjectKind::Table),
            "index" => Ok(ObjectKind::Index),
            "trigger" => Ok(ObjectKind::Trigger),
            "view" => Ok(ObjectKind::View),
            other => Err(Error::DatabaseError(format!("Unknown schema object type: {}", other))),
        }
    }
}

/// A table, index, trigger or view read from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaObject {
    pub kind: ObjectKind,
    pub name: String,
    pub owner_table: Option<String>,
    /// Creation statement, replayed verbatim into the target
    pub definition_sql: String,
}

/// A single dynamically typed SQLite value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Decode column `index` of `row` using the value's storage class
    pub fn decode(row: &SqliteRow, index: usize) -> Result<Self> {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(SqlValue::Null);
        }

        let value = match raw.type_info().name() {
            "INTEGER" => SqlValue::Integer(row.try_get_unchecked(index)?),
            "REAL" => SqlValue::Real(row.try_get_unchecked(index)?),
            "BLOB" => SqlValue::Blob(row.try_get_unchecked(index)?),
            _ => SqlValue::Text(row.try_get_unchecked(index)?),
        };
        Ok(value)
    }

    /// Bind this value as the next parameter of `query`
    pub fn bind_to<'q>(
        self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        match self {
            SqlValue::Null => query.bind(Option::<i64>::None),
            SqlValue::Integer(v) => query.bind(v),
            SqlValue::Real(v) => query.bind(v),
            SqlValue::Text(v) => query.bind(v),
            SqlValue::Blob(v) => query.bind(v),
        }
    }
}
