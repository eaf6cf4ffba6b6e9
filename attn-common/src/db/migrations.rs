//! Database schema migrations
//!
//! Versioned migrations tracked in the `schema_version` table. Each migration
//! runs once; never modify an existing migration, add a new one instead.
//!
//! # Schema
//!
//! The attendance grid is stored cell by cell:
//!
//! ```text
//! sheets         (name)                            one row per named sheet
//! sheet_headers  (sheet, col_idx, kind, value)     row 0 of the grid
//! sheet_cells    (sheet, row_idx, col_idx, value)  rows >= 1, sparse
//! ```
//!
//! `sheet_headers.kind` is `text` for literal labels or `date` for a
//! structured ISO date imported from a legacy spreadsheet.

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Get current schema version from database (0 when nothing applied)
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    Ok(())
}

/// Migration v1: attendance grid tables
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sheets (
            name TEXT PRIMARY KEY,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sheet_headers (
            sheet TEXT NOT NULL REFERENCES sheets(name) ON DELETE CASCADE,
            col_idx INTEGER NOT NULL CHECK (col_idx >= 0),
            kind TEXT NOT NULL CHECK (kind IN ('text', 'date')),
            value TEXT NOT NULL,
            PRIMARY KEY (sheet, col_idx)
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sheet_cells (
            sheet TEXT NOT NULL REFERENCES sheets(name) ON DELETE CASCADE,
            row_idx INTEGER NOT NULL CHECK (row_idx >= 1),
            col_idx INTEGER NOT NULL CHECK (col_idx >= 0),
            value TEXT NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (sheet, row_idx, col_idx)
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
