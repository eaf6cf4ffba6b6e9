//! Integration tests for database initialization

use attn_common::db::init_database;
use attn_common::db::migrations::get_schema_version;
use attn_common::db::CURRENT_SCHEMA_VERSION;
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("attendance.db");

    let pool = init_database(&db_path).await.expect("init should succeed");
    assert!(db_path.exists(), "Database file was not created");

    let version = get_schema_version(&pool).await.unwrap();
    assert_eq!(version, CURRENT_SCHEMA_VERSION);
}

#[tokio::test]
async fn test_database_reopen_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("attendance.db");

    let pool1 = init_database(&db_path).await.unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await.expect("reopen should succeed");
    let versions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_version")
        .fetch_one(&pool2)
        .await
        .unwrap();
    assert_eq!(versions, CURRENT_SCHEMA_VERSION as i64);
}

#[tokio::test]
async fn test_grid_tables_exist() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("attendance.db"))
        .await
        .unwrap();

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for expected in ["schema_version", "sheet_cells", "sheet_headers", "sheets"] {
        assert!(
            tables.iter().any(|t| t == expected),
            "Should have table: {}",
            expected
        );
    }
}

#[tokio::test]
async fn test_header_kind_is_constrained() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("attendance.db"))
        .await
        .unwrap();

    sqlx::query("INSERT INTO sheets (name) VALUES ('Attendance')")
        .execute(&pool)
        .await
        .unwrap();

    let bad = sqlx::query(
        "INSERT INTO sheet_headers (sheet, col_idx, kind, value) VALUES ('Attendance', 0, 'number', '1')",
    )
    .execute(&pool)
    .await;
    assert!(bad.is_err(), "kind outside text/date must be rejected");
}
