mod common;

use pretty_assertions::assert_eq;
use std::fs;
use tempfile::tempdir;

use schema_bridge::config::ErrorPolicy;
use schema_bridge::db::backup_database;
use schema_bridge::migrate::{Decision, FixedDecision, TableOutcome};
use schema_bridge::{Config, Database, Error, MigrationRun};

use common::{count, write_database};

fn config_in(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.databases.source = dir.join("overseerr.sqlite3");
    config.databases.reference = dir.join("jellyseerr.sqlite3");
    config.databases.output = dir.join("newjelly_db.sqlite3");
    config.backup.directory = dir.join("backups");
    config.migration.on_error = ErrorPolicy::Abort;
    config.migration.report_file = Some(dir.join("report.json"));
    config
}

#[tokio::test]
async fn full_run_backs_up_clones_and_migrates() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    write_database(
        &config.databases.source,
        &[
            r#"CREATE TABLE "user" ("id" integer PRIMARY KEY, "email" varchar, "plexToken" varchar)"#,
            r#"INSERT INTO "user" VALUES (1, 'a@example.com', 'tok')"#,
        ],
    )
    .await;
    write_database(
        &config.databases.reference,
        &[
            r#"CREATE TABLE "user" ("id" integer PRIMARY KEY, "email" varchar, "jellyfinUserId" varchar)"#,
            r#"CREATE INDEX "IDX_user_email" ON "user" ("email")"#,
            r#"INSERT INTO "user" VALUES (99, 'ref@example.com', 'j')"#,
        ],
    )
    .await;
    let source_bytes = fs::read(&config.databases.source).unwrap();

    let run = MigrationRun::new(config.clone()).unwrap();
    let summary = run.run(&mut FixedDecision(Decision::Abort)).await.unwrap();

    assert_eq!(summary.backups.len(), 2);
    assert!(summary.backups.iter().all(|b| b.is_file()));
    assert_eq!(summary.clone.tables, vec!["user"]);
    assert_eq!(summary.report.outcomes["user"], TableOutcome::Migrated { rows: 1 });
    assert_eq!(summary.report.outcomes["media"], TableOutcome::Missing {
        database: schema_bridge::DatabaseRole::Source,
    });

    let mut output = Database::open_target(&config.databases.output, false).await.unwrap();
    assert_eq!(count(&mut output, "user").await, 1);

    // inputs are untouched
    assert_eq!(fs::read(&config.databases.source).unwrap(), source_bytes);

    let report = fs::read_to_string(dir.path().join("report.json")).unwrap();
    assert!(report.contains("plexToken"));
    assert!(report.contains("jellyfinUserId"));
}

#[tokio::test]
async fn aborted_run_surfaces_the_failing_table() {
    let dir = tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.backup.enabled = false;
    config.migration.tables = vec!["user".to_string()];
    write_database(
        &config.databases.source,
        &[
            r#"CREATE TABLE "user" ("id" integer PRIMARY KEY)"#,
            r#"INSERT INTO "user" VALUES (1)"#,
        ],
    )
    .await;
    write_database(
        &config.databases.reference,
        &[r#"CREATE TABLE "user" ("id" integer PRIMARY KEY, "userType" integer NOT NULL)"#],
    )
    .await;

    let run = MigrationRun::new(config.clone()).unwrap();
    let err = run.run(&mut FixedDecision(Decision::Abort)).await.unwrap_err();

    assert!(matches!(err, Error::MigrationAborted { ref table } if table == "user"));
    assert!(!dir.path().join("backups").exists());
    assert!(!dir.path().join("report.json").exists());
}

#[tokio::test]
async fn run_rejects_missing_inputs_before_writing() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());

    let run = MigrationRun::new(config.clone()).unwrap();
    let err = run.run(&mut FixedDecision(Decision::Abort)).await.unwrap_err();

    assert!(matches!(err, Error::DatabaseError(_)));
    assert!(!config.databases.output.exists());
}

#[tokio::test]
async fn output_naming_an_input_is_rejected() {
    let dir = tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.backup.enabled = false;
    write_database(
        &config.databases.source,
        &[
            r#"CREATE TABLE "user" ("id" integer PRIMARY KEY)"#,
            r#"INSERT INTO "user" VALUES (1)"#,
        ],
    )
    .await;
    write_database(&config.databases.reference, &[r#"CREATE TABLE "user" ("id" integer PRIMARY KEY)"#]).await;
    fs::create_dir(dir.path().join("sub")).unwrap();

    for output in [
        dir.path().join("sub/../overseerr.sqlite3"),
        dir.path().join("absent/../jellyseerr.sqlite3"),
        dir.path().join("./jellyseerr.sqlite3"),
    ] {
        config.databases.output = output.clone();
        let err = MigrationRun::new(config.clone()).err();
        assert!(matches!(err, Some(Error::ConfigError(_))), "{}", output.display());
    }

    let mut source = Database::open_read_only(&config.databases.source, schema_bridge::DatabaseRole::Source)
        .await
        .unwrap();
    assert_eq!(count(&mut source, "user").await, 1);
}

#[cfg(unix)]
#[tokio::test]
async fn output_is_rechecked_when_the_run_starts() {
    let dir = tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.backup.enabled = false;
    config.migration.tables = vec!["user".to_string()];
    write_database(
        &config.databases.source,
        &[
            r#"CREATE TABLE "user" ("id" integer PRIMARY KEY)"#,
            r#"INSERT INTO "user" VALUES (1)"#,
        ],
    )
    .await;
    write_database(&config.databases.reference, &[r#"CREATE TABLE "user" ("id" integer PRIMARY KEY)"#]).await;

    let run = MigrationRun::new(config.clone()).unwrap();
    // the output turns into a link to the source after validation
    std::os::unix::fs::symlink(&config.databases.source, &config.databases.output).unwrap();
    let err = run.run(&mut FixedDecision(Decision::Abort)).await.unwrap_err();

    assert!(matches!(err, Error::ConfigError(_)));
    let mut source = Database::open_read_only(&config.databases.source, schema_bridge::DatabaseRole::Source)
        .await
        .unwrap();
    assert_eq!(count(&mut source, "user").await, 1);
}

#[test]
fn backups_of_different_inputs_get_distinct_names() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("db.sqlite3");
    fs::write(&db, b"SQLite format 3\0").unwrap();
    let backups = dir.path().join("backups");

    let first = backup_database(&db, "jellyseerr_original", &backups).unwrap();
    let second = backup_database(&db, "overseerr_original", &backups).unwrap();

    assert_ne!(first, second);
    let name = first.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("jellyseerr_original_"));
    assert!(name.ends_with(".db"));
    assert_eq!(fs::read(&first).unwrap(), fs::read(&db).unwrap());
}

#[test]
fn config_file_round_trips_through_loader() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bridge.toml");
    fs::write(
        &path,
        r#"
        [databases]
        source = "old.db"
        reference = "ref.db"
        output = "new.db"

        [migration]
        tables = ["media", "user"]
        on_error = "abort"
        enforce_foreign_keys = true

        [logging]
        level = "debug"
        format = "json"
        "#,
    )
    .unwrap();

    let config = schema_bridge::config::load_from_file(&path).unwrap();

    assert_eq!(config.migration.tables, vec!["media", "user"]);
    assert_eq!(config.migration.on_error, ErrorPolicy::Abort);
    assert!(config.migration.enforce_foreign_keys);
    assert_eq!(config.logging.format, "json");
    assert!(MigrationRun::new(config).is_ok());
}

#[test]
fn unreadable_config_is_a_config_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bridge.toml");
    fs::write(&path, "[migration]\ntables = 3\n").unwrap();

    let err = schema_bridge::config::load_from_file(&path).unwrap_err();
    assert!(matches!(err, Error::ConfigError(_)));
}
