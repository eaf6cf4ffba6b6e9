//! In-process sheet store
//!
//! Backs tests and dry runs. Clones share the same grid, so a test can keep a
//! handle and inspect what the service wrote.

use super::{
    validate_student_cell, HeaderCell, SheetSnapshot, SheetStore, StorageError, StorageResult,
    FIXED_HEADERS, PHOTO_LINK_COL,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Grid {
    header: Vec<HeaderCell>,
    rows: Vec<Vec<String>>,
}

/// Grid held in memory behind an async lock
#[derive(Clone)]
pub struct MemorySheetStore {
    sheet_name: String,
    grid: Arc<RwLock<Option<Grid>>>,
}

impl MemorySheetStore {
    /// Empty sheet with the fixed header
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self::with_students(sheet_name, &[])
    }

    /// Store whose sheet does not exist
    pub fn missing(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            grid: Arc::new(RwLock::new(None)),
        }
    }

    /// Sheet pre-populated with `(name, student_id)` rows
    pub fn with_students(sheet_name: impl Into<String>, students: &[(&str, &str)]) -> Self {
        let grid = Grid {
            header: FIXED_HEADERS.iter().map(|h| HeaderCell::text(*h)).collect(),
            rows: students
                .iter()
                .map(|(name, id)| vec![name.to_string(), id.to_string(), String::new()])
                .collect(),
        };
        Self {
            sheet_name: sheet_name.into(),
            grid: Arc::new(RwLock::new(Some(grid))),
        }
    }

    /// Append a header cell exactly as given (e.g. a legacy structured date)
    pub async fn push_header(&self, cell: HeaderCell) {
        if let Some(grid) = self.grid.write().await.as_mut() {
            grid.header.push(cell);
        }
    }

    /// Append a raw row of cells
    pub async fn push_row(&self, cells: Vec<String>) {
        if let Some(grid) = self.grid.write().await.as_mut() {
            grid.rows.push(cells);
        }
    }

    fn missing_sheet(&self) -> StorageError {
        StorageError::not_found(format!("sheet '{}' does not exist", self.sheet_name))
    }
}

#[async_trait]
impl SheetStore for MemorySheetStore {
    fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    async fn snapshot(&self) -> StorageResult<SheetSnapshot> {
        let guard = self.grid.read().await;
        let grid = guard.as_ref().ok_or_else(|| self.missing_sheet())?;
        Ok(SheetSnapshot {
            header: grid.header.clone(),
            rows: grid.rows.clone(),
        })
    }

    async fn append_column(&self, header: &str) -> StorageResult<usize> {
        let mut guard = self.grid.write().await;
        let grid = guard.as_mut().ok_or_else(|| self.missing_sheet())?;
        grid.header.push(HeaderCell::text(header));
        Ok(grid.header.len() - 1)
    }

    async fn write_cell(&self, row: usize, col: usize, value: &str) -> StorageResult<()> {
        validate_student_cell(row)?;

        let mut guard = self.grid.write().await;
        let grid = guard.as_mut().ok_or_else(|| self.missing_sheet())?;
        if col >= grid.header.len() {
            return Err(StorageError::invalid(format!("column {} does not exist", col)));
        }
        let cells = grid
            .rows
            .get_mut(row - 1)
            .ok_or_else(|| StorageError::invalid(format!("row {} does not exist", row)))?;

        if cells.len() <= col {
            cells.resize(col + 1, String::new());
        }
        cells[col] = value.to_string();
        Ok(())
    }

    async fn append_row(&self, name: &str, student_id: &str) -> StorageResult<usize> {
        let mut guard = self.grid.write().await;
        let grid = guard.as_mut().ok_or_else(|| self.missing_sheet())?;

        let mut cells = vec![String::new(); PHOTO_LINK_COL + 1];
        cells[0] = name.to_string();
        cells[1] = student_id.to_string();
        grid.rows.push(cells);
        Ok(grid.rows.len())
    }
}
