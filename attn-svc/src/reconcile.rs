//! Attendance reconciliation
//!
//! Turns one kiosk submission into exactly one consistent mutation of the
//! attendance sheet:
//!
//! 1. Validate the student id and decode the photo (no lock, no mutation)
//! 2. Acquire the sheet lock (bounded wait, fail fast with "server busy")
//! 3. Snapshot the grid once
//! 4. Resolve the student row (never created here)
//! 5. Resolve or create today's date column
//! 6. Mark `Present`
//! 7. Replace the student's photo (previous asset trashed best effort)
//! 8. Release the lock on every exit path (guard drop)
//!
//! There is no rollback. If the photo step fails after step 6, attendance
//! stays marked and the error is reported.

use std::sync::Arc;
use std::time::Duration;

use attn_common::time::Clock;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::blob::{asset_name, BlobError, BlobStore, TrashOutcome};
use crate::lock::{LockError, SheetLock};
use crate::photo::{PhotoError, PhotoPayload};
use crate::sheet::{
    resolve_or_create_column, SheetSnapshot, SheetStore, StorageError, StorageErrorKind,
    PHOTO_LINK_COL, PRESENT,
};

/// Body posted by a kiosk
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub image: String,
    /// Display name the kiosk believes the student has; logged only
    #[serde(default)]
    pub student_name: Option<String>,
    /// Mentor label recognized by the kiosk; logged only, never verified
    #[serde(default)]
    pub mentor: Option<String>,
}

/// Successful submission details
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub file_url: String,
    pub date_label: String,
    pub row: usize,
    pub col: usize,
    pub column_created: bool,
    pub previous_photo: TrashOutcome,
}

/// How a failure should be treated by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Lock contention; retry later, nothing was written
    Contention,
    /// Backing sheet missing or misconfigured; needs an operator
    Configuration,
    /// Caller must fix the request
    CallerInput,
    /// Anything else
    Internal,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("student ID is required")]
    MissingStudentId,

    #[error("invalid image: {0}")]
    InvalidImage(#[from] PhotoError),

    #[error("server busy")]
    Busy { waited: Duration },

    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    #[error("student ID not found: {0}")]
    StudentNotFound(String),

    #[error("student ID already enrolled: {0}")]
    DuplicateStudent(String),

    #[error("{0}")]
    Storage(StorageError),

    #[error("attendance recorded but photo could not be stored: {0}")]
    Photo(#[from] BlobError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl SubmitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SubmitError::Busy { .. } => ErrorKind::Contention,
            SubmitError::SheetNotFound(_) => ErrorKind::Configuration,
            SubmitError::MissingStudentId
            | SubmitError::InvalidImage(_)
            | SubmitError::StudentNotFound(_)
            | SubmitError::DuplicateStudent(_) => ErrorKind::CallerInput,
            SubmitError::Storage(e) if e.kind == StorageErrorKind::NotFound => {
                ErrorKind::Configuration
            }
            SubmitError::Storage(_) | SubmitError::Photo(_) | SubmitError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<LockError> for SubmitError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Busy { waited } => SubmitError::Busy { waited },
        }
    }
}

/// The attendance reconciliation service
pub struct ReconciliationService {
    sheets: Arc<dyn SheetStore>,
    blobs: Arc<dyn BlobStore>,
    lock: SheetLock,
    clock: Arc<dyn Clock>,
}

impl ReconciliationService {
    pub fn new(
        sheets: Arc<dyn SheetStore>,
        blobs: Arc<dyn BlobStore>,
        lock: SheetLock,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sheets,
            blobs,
            lock,
            clock,
        }
    }

    pub fn lock(&self) -> &SheetLock {
        &self.lock
    }

    pub fn sheet_name(&self) -> &str {
        self.sheets.sheet_name()
    }

    /// Record attendance and store the photo for one student
    pub async fn submit(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionReceipt, SubmitError> {
        let student_id = request.student_id.trim();
        if student_id.is_empty() {
            return Err(SubmitError::MissingStudentId);
        }
        let photo = PhotoPayload::from_data_uri(&request.image)?;
        let today = self.clock.today();

        let _guard = self.lock.acquire().await.map_err(|e| {
            warn!(student_id, error = %e, "Rejecting submission, sheet busy");
            SubmitError::from(e)
        })?;

        let snapshot = self.snapshot().await?;
        let row = snapshot
            .find_row_by_key(student_id)
            .ok_or_else(|| SubmitError::StudentNotFound(student_id.to_string()))?;

        let column = resolve_or_create_column(self.sheets.as_ref(), &snapshot, today)
            .await
            .map_err(|e| self.storage_error(e))?;

        self.sheets
            .write_cell(row, column.col, PRESENT)
            .await
            .map_err(|e| self.storage_error(e))?;
        info!(
            student_id,
            row,
            col = column.col,
            date = %column.label,
            mentor = request.mentor.as_deref().unwrap_or(""),
            kiosk_name = request.student_name.as_deref().unwrap_or(""),
            "Marked present"
        );

        let previous_link = snapshot.cell(row, PHOTO_LINK_COL);
        let name = asset_name(student_id, today, &photo.content_type);
        let replacement = self
            .blobs
            .replace_blob(previous_link, &name, &photo.content_type, &photo.bytes)
            .await
            .map_err(|e| {
                warn!(student_id, error = %e, "Photo store failed after attendance was marked");
                SubmitError::Photo(e)
            })?;

        self.sheets
            .write_cell(row, PHOTO_LINK_COL, &replacement.blob.url)
            .await
            .map_err(|e| {
                warn!(
                    student_id,
                    url = %replacement.blob.url,
                    error = %e,
                    "PhotoLink not written, new photo is orphaned"
                );
                self.storage_error(e)
            })?;

        info!(student_id, url = %replacement.blob.url, "Stored attendance photo");

        Ok(SubmissionReceipt {
            file_url: replacement.blob.url,
            date_label: column.label,
            row,
            col: column.col,
            column_created: column.created,
            previous_photo: replacement.previous,
        })
    }

    /// Add a student row; ids must be unique after trimming
    pub async fn enroll(&self, name: &str, student_id: &str) -> Result<usize, SubmitError> {
        let student_id = student_id.trim();
        if student_id.is_empty() {
            return Err(SubmitError::MissingStudentId);
        }

        let _guard = self.lock.acquire().await?;
        let snapshot = self.snapshot().await?;
        if snapshot.find_row_by_key(student_id).is_some() {
            return Err(SubmitError::DuplicateStudent(student_id.to_string()));
        }

        let row = self
            .sheets
            .append_row(name.trim(), student_id)
            .await
            .map_err(|e| self.storage_error(e))?;
        info!(student_id, row, "Enrolled student");
        Ok(row)
    }

    /// Read-only view of the whole sheet
    pub async fn view(&self) -> Result<SheetSnapshot, SubmitError> {
        self.snapshot().await
    }

    async fn snapshot(&self) -> Result<SheetSnapshot, SubmitError> {
        self.sheets.snapshot().await.map_err(|e| self.storage_error(e))
    }

    fn storage_error(&self, err: StorageError) -> SubmitError {
        match err.kind {
            StorageErrorKind::NotFound => {
                SubmitError::SheetNotFound(self.sheets.sheet_name().to_string())
            }
            _ => SubmitError::Storage(err),
        }
    }
}
