//! Attendance sheet model and storage port
//!
//! A sheet is a 2-D grid. Row 0 is the header; rows >= 1 are students.
//!
//! ```text
//!        0       1           2            3           4
//!   0  | Name  | StudentId | PhotoLink  | 3/13/2024 | 3/14/2024 | ...
//!   1  | Alice | A100      | http://... | Present   |           |
//!   2  | Bob   | B200      |            |           | Present   |
//! ```
//!
//! Backends implement [`SheetStore`]; the reconciliation core only ever talks
//! to that trait.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use attn_common::time::{date_label, parse_date_label, same_day};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::info;

pub use memory::MemorySheetStore;
pub use sqlite::SqliteSheetStore;

pub const NAME_COL: usize = 0;
pub const STUDENT_ID_COL: usize = 1;
pub const PHOTO_LINK_COL: usize = 2;
pub const FIRST_DATE_COL: usize = 3;

/// Fixed identity columns every sheet starts with
pub const FIXED_HEADERS: [&str; 3] = ["Name", "StudentId", "PhotoLink"];

/// Cell value written when a student is marked
pub const PRESENT: &str = "Present";

/// A header cell as the backing store holds it
///
/// Legacy spreadsheets may hold date headers as structured dates rather than
/// text. New columns are always written as [`HeaderCell::Text`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum HeaderCell {
    Text(String),
    Date(NaiveDate),
}

impl HeaderCell {
    pub fn text(label: impl Into<String>) -> Self {
        HeaderCell::Text(label.into())
    }

    /// Display label; structured dates render in canonical `M/d/yyyy` form
    pub fn label(&self) -> String {
        match self {
            HeaderCell::Text(text) => text.clone(),
            HeaderCell::Date(day) => date_label(*day),
        }
    }

    /// The calendar day this header denotes, if any
    pub fn calendar_day(&self) -> Option<NaiveDate> {
        match self {
            HeaderCell::Text(text) => parse_date_label(text),
            HeaderCell::Date(day) => Some(*day),
        }
    }
}

/// In-memory copy of the whole grid taken once per request
///
/// Indices resolved against a snapshot stay valid for the rest of the request
/// because all writers are serialized by the sheet lock and columns/rows are
/// only ever appended.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SheetSnapshot {
    pub header: Vec<HeaderCell>,
    /// `rows[i]` is sheet row `i + 1`
    pub rows: Vec<Vec<String>>,
}

impl SheetSnapshot {
    /// Number of student rows
    pub fn student_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell text at a sheet coordinate; missing cells read as empty
    pub fn cell(&self, row: usize, col: usize) -> &str {
        if row == 0 {
            return "";
        }
        self.rows
            .get(row - 1)
            .and_then(|cells| cells.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// First row (top-down) whose trimmed StudentId equals `key`
    ///
    /// Comparison is case-sensitive string equality; `"007"` and `"7"` differ.
    pub fn find_row_by_key(&self, key: &str) -> Option<usize> {
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        self.rows
            .iter()
            .position(|cells| {
                cells
                    .get(STUDENT_ID_COL)
                    .map(|id| id.trim() == key)
                    .unwrap_or(false)
            })
            .map(|index| index + 1)
    }

    /// First header column (left-to-right) denoting `day`
    ///
    /// Matches text and structured-date headers alike by comparing day,
    /// month and year components. Fixed columns never match.
    pub fn find_date_column(&self, day: NaiveDate) -> Option<usize> {
        self.header
            .iter()
            .enumerate()
            .skip(FIRST_DATE_COL)
            .find(|(_, cell)| {
                cell.calendar_day()
                    .map(|candidate| same_day(candidate, day))
                    .unwrap_or(false)
            })
            .map(|(col, _)| col)
    }

    /// Header labels as display strings
    pub fn labels(&self) -> Vec<String> {
        self.header.iter().map(HeaderCell::label).collect()
    }
}

/// Category of a storage failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    /// Sheet (or other addressed resource) does not exist
    NotFound,
    /// Request was structurally invalid for this store
    Invalid,
    /// Backend failed (I/O, database, lock)
    Backend,
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageErrorKind::NotFound => "not found",
            StorageErrorKind::Invalid => "invalid",
            StorageErrorKind::Backend => "backend",
        };
        f.write_str(name)
    }
}

/// Storage error with an explicit kind and message
#[derive(Debug, Clone, Error)]
#[error("storage {kind}: {message}")]
pub struct StorageError {
    pub kind: StorageErrorKind,
    pub message: String,
}

impl StorageError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: StorageErrorKind::NotFound,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            kind: StorageErrorKind::Invalid,
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self {
            kind: StorageErrorKind::Backend,
            message: message.into(),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage port for one named attendance sheet
///
/// Implementations need not be internally synchronized across calls; the
/// caller holds the sheet lock for every read-modify-write sequence.
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Name of the sheet this store is bound to
    fn sheet_name(&self) -> &str;

    /// Read header and every student row in one pass
    async fn snapshot(&self) -> StorageResult<SheetSnapshot>;

    /// Append a column whose header is the literal text `header`
    ///
    /// Returns the new column index.
    async fn append_column(&self, header: &str) -> StorageResult<usize>;

    /// Set a single student cell (`row >= 1`)
    async fn write_cell(&self, row: usize, col: usize, value: &str) -> StorageResult<()>;

    /// Append a student row with an empty PhotoLink; returns the row index
    async fn append_row(&self, name: &str, student_id: &str) -> StorageResult<usize>;
}

/// Date column chosen for a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnResolution {
    pub col: usize,
    pub label: String,
    pub created: bool,
}

/// Reuse the column denoting `day` or append a new canonical text column
pub async fn resolve_or_create_column(
    store: &dyn SheetStore,
    snapshot: &SheetSnapshot,
    day: NaiveDate,
) -> StorageResult<ColumnResolution> {
    let label = date_label(day);

    if let Some(col) = snapshot.find_date_column(day) {
        return Ok(ColumnResolution {
            col,
            label,
            created: false,
        });
    }

    let col = store.append_column(&label).await?;
    info!(sheet = store.sheet_name(), col, label = %label, "Created date column");

    Ok(ColumnResolution {
        col,
        label,
        created: true,
    })
}

pub(crate) fn validate_student_cell(row: usize) -> StorageResult<()> {
    if row == 0 {
        return Err(StorageError::invalid(
            "row 0 is the header row and cannot be written as a cell",
        ));
    }
    Ok(())
}
