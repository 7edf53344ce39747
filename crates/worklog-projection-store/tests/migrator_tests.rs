//! Integration tests for the namespaced migration runner.

use std::path::Path;
use std::sync::Arc;

use worklog_projection_store::ProjectionDb;
use worklog_projection_store::migrator::{MigrationError, Migrator, checksum};
use worklog_test_support::{FixedClock, base_time};

const CREATE_GOALS: &str = "CREATE TABLE goals (id TEXT PRIMARY KEY, title TEXT NOT NULL);";
const INDEX_GOALS: &str = "CREATE INDEX idx_goals_title ON goals (title);";

fn write(root: &Path, relative: &str, sql: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, sql).unwrap();
}

fn migrator(root: &Path) -> Migrator {
    Migrator::new(root, Arc::new(FixedClock(base_time())))
}

async fn open_db(dir: &Path) -> ProjectionDb {
    ProjectionDb::open(dir.join("projections.db")).await.unwrap()
}

async fn tracked(db: &ProjectionDb) -> Vec<(String, i64, String)> {
    sqlx::query_as("SELECT namespace, version, checksum FROM schema_migrations ORDER BY namespace, version")
        .fetch_all(db.pool())
        .await
        .unwrap()
}

async fn table_exists(db: &ProjectionDb, name: &str) -> bool {
    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(name)
            .fetch_one(db.pool())
            .await
            .unwrap();
    count.0 == 1
}

// --- discover ---

#[tokio::test]
async fn test_discover_names_namespaces_by_relative_path_in_lexical_order() {
    // Arrange
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "work/goals/002-add-index.sql", INDEX_GOALS);
    write(root.path(), "work/goals/001-create.sql", CREATE_GOALS);
    write(root.path(), "core/activity/001-create.sql", "SELECT 1;");
    write(root.path(), "work/goals/README.md", "not a migration");

    // Act
    let found = migrator(root.path()).discover().await.unwrap();

    // Assert
    let keys: Vec<(&str, i64, &str)> = found
        .iter()
        .map(|m| (m.namespace.as_str(), m.version, m.name.as_str()))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("core/activity", 1, "create"),
            ("work/goals", 1, "create"),
            ("work/goals", 2, "add-index"),
        ]
    );
    assert_eq!(found[1].checksum, checksum(CREATE_GOALS));
}

#[tokio::test]
async fn test_discover_returns_nothing_when_root_missing() {
    let dir = tempfile::tempdir().unwrap();

    let found = migrator(&dir.path().join("absent")).discover().await.unwrap();

    assert!(found.is_empty());
}

#[tokio::test]
async fn test_discover_rejects_non_conforming_sql_file_name() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "work/goals/1-create.sql", CREATE_GOALS);

    let result = migrator(root.path()).discover().await;

    assert!(matches!(result, Err(MigrationError::InvalidFileName { .. })));
}

#[tokio::test]
async fn test_discover_rejects_upper_case_sql_extension() {
    // Arrange
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "work/goals/001-create.sql", CREATE_GOALS);
    write(root.path(), "work/goals/002-add-index.SQL", INDEX_GOALS);

    // Act
    let result = migrator(root.path()).discover().await;

    // Assert
    match result {
        Err(MigrationError::InvalidFileName { path }) => {
            assert!(path.ends_with("work/goals/002-add-index.SQL"));
        }
        other => panic!("expected InvalidFileName, got {other:?}"),
    }
}

#[tokio::test]
async fn test_discover_rejects_duplicate_version_in_namespace() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "work/goals/001-create.sql", CREATE_GOALS);
    write(root.path(), "work/goals/001-create-again.sql", CREATE_GOALS);

    let result = migrator(root.path()).discover().await;

    match result {
        Err(MigrationError::DuplicateVersion { namespace, version }) => {
            assert_eq!(namespace, "work/goals");
            assert_eq!(version, 1);
        }
        other => panic!("expected DuplicateVersion, got {other:?}"),
    }
}

#[tokio::test]
async fn test_same_version_in_different_namespaces_is_allowed() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "work/goals/001-create.sql", CREATE_GOALS);
    write(root.path(), "work/tasks/001-create.sql", "CREATE TABLE tasks (id TEXT);");

    let found = migrator(root.path()).discover().await.unwrap();

    assert_eq!(found.len(), 2);
}

// --- run ---

#[tokio::test]
async fn test_run_applies_only_untracked_migration_and_records_its_checksum() {
    // Arrange
    let root = tempfile::tempdir().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let db = open_db(dir.path()).await;
    write(root.path(), "work/goals/001-create.sql", CREATE_GOALS);
    let first = migrator(root.path()).run(db.pool()).await.unwrap();
    write(root.path(), "work/goals/002-add-index.sql", INDEX_GOALS);

    // Act
    let second = migrator(root.path()).run(db.pool()).await.unwrap();

    // Assert
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].version, 2);
    assert_eq!(
        tracked(&db).await,
        vec![
            ("work/goals".to_owned(), 1, checksum(CREATE_GOALS)),
            ("work/goals".to_owned(), 2, checksum(INDEX_GOALS)),
        ]
    );
}

#[tokio::test]
async fn test_run_is_a_no_op_once_everything_is_applied() {
    let root = tempfile::tempdir().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let db = open_db(dir.path()).await;
    write(root.path(), "work/goals/001-create.sql", CREATE_GOALS);
    migrator(root.path()).run(db.pool()).await.unwrap();

    let again = migrator(root.path()).run(db.pool()).await.unwrap();

    assert!(again.is_empty());
    assert!(migrator(root.path()).pending(db.pool()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_run_stamps_applied_at_from_clock() {
    let root = tempfile::tempdir().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let db = open_db(dir.path()).await;
    write(root.path(), "work/goals/001-create.sql", CREATE_GOALS);

    migrator(root.path()).run(db.pool()).await.unwrap();

    let applied = migrator(root.path()).applied(db.pool()).await.unwrap();
    assert_eq!(applied[0].applied_at, base_time().to_rfc3339());
    assert_eq!(applied[0].name, "create");
}

#[tokio::test]
async fn test_run_rolls_back_failed_migration_and_its_tracking_row() {
    // Arrange
    let root = tempfile::tempdir().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let db = open_db(dir.path()).await;
    write(root.path(), "work/goals/001-create.sql", CREATE_GOALS);
    write(
        root.path(),
        "work/goals/002-broken.sql",
        "CREATE TABLE half_done (x INTEGER);\nTHIS IS NOT SQL;",
    );

    // Act
    let result = migrator(root.path()).run(db.pool()).await;

    // Assert
    match result {
        Err(MigrationError::Apply { namespace, version, .. }) => {
            assert_eq!(namespace, "work/goals");
            assert_eq!(version, 2);
        }
        other => panic!("expected Apply, got {other:?}"),
    }
    assert_eq!(tracked(&db).await.len(), 1);
    assert!(table_exists(&db, "goals").await);
    assert!(!table_exists(&db, "half_done").await);
}

#[tokio::test]
async fn test_run_applies_version_older_than_newest_applied() {
    let root = tempfile::tempdir().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let db = open_db(dir.path()).await;
    write(root.path(), "work/goals/002-create.sql", CREATE_GOALS);
    migrator(root.path()).run(db.pool()).await.unwrap();
    write(root.path(), "work/goals/001-late.sql", "CREATE TABLE late (x INTEGER);");

    let applied = migrator(root.path()).run(db.pool()).await.unwrap();

    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].version, 1);
    assert!(table_exists(&db, "late").await);
}

// --- verify ---

#[tokio::test]
async fn test_verify_reports_mismatch_for_migration_edited_after_apply() {
    // Arrange
    let root = tempfile::tempdir().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let db = open_db(dir.path()).await;
    write(root.path(), "work/goals/001-create.sql", CREATE_GOALS);
    migrator(root.path()).run(db.pool()).await.unwrap();
    let edited = format!("{CREATE_GOALS}\n-- tweaked later");
    write(root.path(), "work/goals/001-create.sql", &edited);

    // Act
    let result = migrator(root.path()).verify(db.pool()).await;

    // Assert
    match result {
        Err(MigrationError::ChecksumMismatch(drift)) => {
            assert_eq!(drift.len(), 1);
            assert_eq!(drift[0].namespace, "work/goals");
            assert_eq!(drift[0].version, 1);
            assert_eq!(drift[0].recorded, checksum(CREATE_GOALS));
            assert_eq!(drift[0].actual, checksum(&edited));
        }
        other => panic!("expected ChecksumMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_run_refuses_to_apply_anything_when_checksums_drift() {
    let root = tempfile::tempdir().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let db = open_db(dir.path()).await;
    write(root.path(), "work/goals/001-create.sql", CREATE_GOALS);
    migrator(root.path()).run(db.pool()).await.unwrap();
    write(root.path(), "work/goals/001-create.sql", "CREATE TABLE goals (id TEXT);");
    write(root.path(), "work/goals/002-add-index.sql", INDEX_GOALS);

    let result = migrator(root.path()).run(db.pool()).await;

    assert!(matches!(result, Err(MigrationError::ChecksumMismatch(_))));
    assert_eq!(tracked(&db).await.len(), 1);
}

#[tokio::test]
async fn test_verify_warns_but_succeeds_when_applied_file_is_missing() {
    // Arrange
    let root = tempfile::tempdir().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let db = open_db(dir.path()).await;
    write(root.path(), "work/goals/001-create.sql", CREATE_GOALS);
    write(root.path(), "work/goals/002-add-index.sql", INDEX_GOALS);
    migrator(root.path()).run(db.pool()).await.unwrap();
    std::fs::remove_file(root.path().join("work/goals/001-create.sql")).unwrap();

    // Act
    let report = migrator(root.path()).verify(db.pool()).await.unwrap();

    // Assert
    assert_eq!(report.verified, 1);
    assert_eq!(report.missing, vec![("work/goals".to_owned(), 1)]);
}

#[tokio::test]
async fn test_verify_on_fresh_database_reports_nothing() {
    let root = tempfile::tempdir().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let db = open_db(dir.path()).await;
    write(root.path(), "work/goals/001-create.sql", CREATE_GOALS);

    let report = migrator(root.path()).verify(db.pool()).await.unwrap();

    assert_eq!(report.verified, 0);
    assert!(report.missing.is_empty());
}
