//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::path::Path;

use schema_bridge::schema::analyzer::row_count;
use schema_bridge::Database;

/// Create a database at `path` and run `statements` against it
pub async fn create_database(path: &Path, statements: &[&str]) -> Database {
    let mut db = Database::create(path, false).await.expect("create database");
    for statement in statements {
        db.execute(statement)
            .await
            .unwrap_or_else(|e| panic!("executing {statement}: {e}"));
    }
    db
}

/// Create a database file and close it again
pub async fn write_database(path: &Path, statements: &[&str]) {
    create_database(path, statements)
        .await
        .close()
        .await
        .expect("close database");
}

/// Count rows in `table` of an open database
pub async fn count(db: &mut Database, table: &str) -> i64 {
    row_count(db.connection(), table).await.expect("count rows")
}
