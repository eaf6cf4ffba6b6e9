//! SQLite-backed sheet store
//!
//! Cells live in `sheet_cells`, header cells in `sheet_headers`. Every
//! multi-statement operation runs in its own transaction so a crash never
//! leaves a half-appended column or row behind.

use super::{
    validate_student_cell, HeaderCell, SheetSnapshot, SheetStore, StorageError, StorageResult,
    FIXED_HEADERS, NAME_COL, PHOTO_LINK_COL, STUDENT_ID_COL,
};
use async_trait::async_trait;
use attn_common::time::date_label;
use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

const ISO_DATE: &str = "%Y-%m-%d";

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::backend(err.to_string())
    }
}

/// Sheet store bound to one named sheet in the attendance database
#[derive(Clone)]
pub struct SqliteSheetStore {
    pool: SqlitePool,
    sheet_name: String,
}

impl SqliteSheetStore {
    pub fn new(pool: SqlitePool, sheet_name: impl Into<String>) -> Self {
        Self {
            pool,
            sheet_name: sheet_name.into(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the sheet with its fixed header if it does not exist
    ///
    /// Returns `true` when the sheet was created by this call.
    pub async fn create_sheet(&self) -> StorageResult<bool> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query("INSERT OR IGNORE INTO sheets (name) VALUES (?)")
            .bind(&self.sheet_name)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            == 1;

        if inserted {
            for (col, label) in FIXED_HEADERS.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO sheet_headers (sheet, col_idx, kind, value) VALUES (?, ?, 'text', ?)",
                )
                .bind(&self.sheet_name)
                .bind(col as i64)
                .bind(*label)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        if inserted {
            info!(sheet = %self.sheet_name, "Created attendance sheet");
        }
        Ok(inserted)
    }

    pub async fn sheet_exists(&self) -> StorageResult<bool> {
        let mut conn = self.pool.acquire().await?;
        Ok(sheet_exists(&mut conn, &self.sheet_name).await?)
    }

    /// Append a header stored as a structured date
    ///
    /// Used when importing sheets exported from spreadsheet tools that keep
    /// dates as typed values. The service itself never writes this form.
    pub async fn append_date_header(&self, day: NaiveDate) -> StorageResult<usize> {
        let mut tx = self.pool.begin().await?;
        self.require_sheet(&mut tx).await?;

        let col = next_column(&mut tx, &self.sheet_name).await?;
        sqlx::query(
            "INSERT INTO sheet_headers (sheet, col_idx, kind, value) VALUES (?, ?, 'date', ?)",
        )
        .bind(&self.sheet_name)
        .bind(col as i64)
        .bind(day.format(ISO_DATE).to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(col)
    }

    /// Rewrite structured-date headers as canonical `M/d/yyyy` text
    ///
    /// Idempotent; returns the number of headers rewritten.
    pub async fn normalize_date_headers(&self) -> StorageResult<usize> {
        let mut tx = self.pool.begin().await?;

        let legacy: Vec<(i64, String)> = sqlx::query_as(
            "SELECT col_idx, value FROM sheet_headers WHERE sheet = ? AND kind = 'date' ORDER BY col_idx",
        )
        .bind(&self.sheet_name)
        .fetch_all(&mut *tx)
        .await?;

        for (col, value) in &legacy {
            let col = *col;
            let text = NaiveDate::parse_from_str(value, ISO_DATE)
                .map(date_label)
                .unwrap_or_else(|_| value.clone());

            sqlx::query(
                "UPDATE sheet_headers SET kind = 'text', value = ? WHERE sheet = ? AND col_idx = ?",
            )
            .bind(&text)
            .bind(&self.sheet_name)
            .bind(col)
            .execute(&mut *tx)
            .await?;

            debug!(sheet = %self.sheet_name, col, from = %value, to = %text, "Normalized date header");
        }

        tx.commit().await?;
        Ok(legacy.len())
    }

    async fn require_sheet(&self, conn: &mut SqliteConnection) -> StorageResult<()> {
        if sheet_exists(conn, &self.sheet_name).await? {
            Ok(())
        } else {
            Err(StorageError::not_found(format!(
                "sheet '{}' does not exist",
                self.sheet_name
            )))
        }
    }
}

async fn sheet_exists(conn: &mut SqliteConnection, sheet: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM sheets WHERE name = ?)")
        .bind(sheet)
        .fetch_one(&mut *conn)
        .await
}

async fn next_column(conn: &mut SqliteConnection, sheet: &str) -> Result<usize, sqlx::Error> {
    let next: i64 =
        sqlx::query_scalar("SELECT COALESCE(MAX(col_idx) + 1, 0) FROM sheet_headers WHERE sheet = ?")
            .bind(sheet)
            .fetch_one(&mut *conn)
            .await?;
    Ok(next as usize)
}

async fn row_count(conn: &mut SqliteConnection, sheet: &str) -> Result<usize, sqlx::Error> {
    let rows: i64 =
        sqlx::query_scalar("SELECT COALESCE(MAX(row_idx), 0) FROM sheet_cells WHERE sheet = ?")
            .bind(sheet)
            .fetch_one(&mut *conn)
            .await?;
    Ok(rows as usize)
}

fn decode_header(kind: &str, value: String) -> HeaderCell {
    if kind == "date" {
        if let Ok(day) = NaiveDate::parse_from_str(&value, ISO_DATE) {
            return HeaderCell::Date(day);
        }
    }
    HeaderCell::Text(value)
}

#[async_trait]
impl SheetStore for SqliteSheetStore {
    fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    async fn snapshot(&self) -> StorageResult<SheetSnapshot> {
        // One read transaction so header and cells come from the same state
        let mut tx = self.pool.begin().await?;
        self.require_sheet(&mut tx).await?;

        let header_rows: Vec<(i64, String, String)> = sqlx::query_as(
            "SELECT col_idx, kind, value FROM sheet_headers WHERE sheet = ? ORDER BY col_idx",
        )
        .bind(&self.sheet_name)
        .fetch_all(&mut *tx)
        .await?;

        let mut header = Vec::with_capacity(header_rows.len());
        for (col, kind, value) in header_rows {
            let col = col as usize;
            while header.len() < col {
                header.push(HeaderCell::text(""));
            }
            header.push(decode_header(&kind, value));
        }

        let cells: Vec<(i64, i64, String)> = sqlx::query_as(
            "SELECT row_idx, col_idx, value FROM sheet_cells WHERE sheet = ? ORDER BY row_idx, col_idx",
        )
        .bind(&self.sheet_name)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let row_total = cells.iter().map(|(row, _, _)| *row as usize).max().unwrap_or(0);
        let mut rows: Vec<Vec<String>> = vec![Vec::new(); row_total];
        for (row, col, value) in cells {
            let (row, col) = (row as usize, col as usize);
            let target = &mut rows[row - 1];
            if target.len() <= col {
                target.resize(col + 1, String::new());
            }
            target[col] = value;
        }

        Ok(SheetSnapshot { header, rows })
    }

    async fn append_column(&self, header: &str) -> StorageResult<usize> {
        let mut tx = self.pool.begin().await?;
        self.require_sheet(&mut tx).await?;

        let col = next_column(&mut tx, &self.sheet_name).await?;
        sqlx::query(
            "INSERT INTO sheet_headers (sheet, col_idx, kind, value) VALUES (?, ?, 'text', ?)",
        )
        .bind(&self.sheet_name)
        .bind(col as i64)
        .bind(header)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(col)
    }

    async fn write_cell(&self, row: usize, col: usize, value: &str) -> StorageResult<()> {
        validate_student_cell(row)?;

        let mut tx = self.pool.begin().await?;
        self.require_sheet(&mut tx).await?;

        if col >= next_column(&mut tx, &self.sheet_name).await? {
            return Err(StorageError::invalid(format!("column {} does not exist", col)));
        }
        if row > row_count(&mut tx, &self.sheet_name).await? {
            return Err(StorageError::invalid(format!("row {} does not exist", row)));
        }

        sqlx::query(
            r#"
            INSERT INTO sheet_cells (sheet, row_idx, col_idx, value) VALUES (?, ?, ?, ?)
            ON CONFLICT (sheet, row_idx, col_idx)
            DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&self.sheet_name)
        .bind(row as i64)
        .bind(col as i64)
        .bind(value)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn append_row(&self, name: &str, student_id: &str) -> StorageResult<usize> {
        let mut tx = self.pool.begin().await?;
        self.require_sheet(&mut tx).await?;

        let row = row_count(&mut tx, &self.sheet_name).await? + 1;
        for (col, value) in [
            (NAME_COL, name),
            (STUDENT_ID_COL, student_id),
            (PHOTO_LINK_COL, ""),
        ] {
            sqlx::query(
                "INSERT INTO sheet_cells (sheet, row_idx, col_idx, value) VALUES (?, ?, ?, ?)",
            )
            .bind(&self.sheet_name)
            .bind(row as i64)
            .bind(col as i64)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(row)
    }
}
