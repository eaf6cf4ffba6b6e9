//! Photo blob storage
//!
//! Each stored photo gets an opaque id and a durable URL that is written into
//! the student's PhotoLink cell. Replacing a student's photo trashes the asset
//! the old link points at (best effort) before the new one is created, so at
//! most one live photo per student remains.

pub mod folder;
pub mod memory;

use async_trait::async_trait;
use attn_common::time::file_date_label;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::photo::extension_for;

pub use folder::FolderBlobStore;
pub use memory::MemoryBlobStore;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("photo not found: {0}")]
    NotFound(String),

    #[error("not a photo link managed by this store: {0}")]
    Foreign(String),

    #[error("invalid photo name: {0}")]
    InvalidName(String),

    #[error("photo storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A freshly created asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub id: String,
    pub url: String,
}

/// Bytes of a stored asset
#[derive(Debug, Clone)]
pub struct BlobContent {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// What happened to the previous asset during a replace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrashOutcome {
    /// No previous link, or it points somewhere this store does not manage
    Skipped,
    /// Previous asset moved to trash
    Trashed,
    /// Trash attempted and failed; the failure was logged and swallowed
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct BlobReplacement {
    pub blob: StoredBlob,
    pub previous: TrashOutcome,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// True when `url` has this store's link shape
    fn owns(&self, url: &str) -> bool;

    async fn create(&self, name: &str, content_type: &str, bytes: &[u8])
        -> Result<StoredBlob, BlobError>;

    /// Move the asset behind `url` out of the live set
    async fn trash(&self, url: &str) -> Result<(), BlobError>;

    /// Read a live asset by id and file name
    async fn open(&self, id: &str, name: &str) -> Result<BlobContent, BlobError>;

    /// Best-effort trash of whatever `previous_link` points at
    ///
    /// Never fails: the outcome is logged and returned for inspection.
    async fn trash_previous(&self, previous_link: &str) -> TrashOutcome {
        let link = previous_link.trim();
        if link.is_empty() {
            return TrashOutcome::Skipped;
        }
        if !self.owns(link) {
            debug!(link = %link, "Previous photo link is not managed here, leaving it alone");
            return TrashOutcome::Skipped;
        }

        match self.trash(link).await {
            Ok(()) => {
                info!(link = %link, "Trashed previous photo");
                TrashOutcome::Trashed
            }
            Err(e) => {
                warn!(link = %link, error = %e, "Could not trash previous photo, continuing");
                TrashOutcome::Failed(e.to_string())
            }
        }
    }

    /// Trash the previous asset (best effort), then store the new one
    async fn replace_blob(
        &self,
        previous_link: &str,
        name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<BlobReplacement, BlobError> {
        let previous = self.trash_previous(previous_link).await;
        let blob = self.create(name, content_type, bytes).await?;
        Ok(BlobReplacement { blob, previous })
    }
}

/// Deterministic asset name: `<studentId>_<M-d-yyyy>.<ext>`
///
/// Characters outside `[A-Za-z0-9._-]` in the student id become `_` and
/// leading dots are dropped, so the result is always a plain file name.
pub fn asset_name(student_id: &str, day: NaiveDate, content_type: &str) -> String {
    let mapped: String = student_id
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let safe_id = match mapped.trim_start_matches('.') {
        "" => "student",
        rest => rest,
    };
    format!(
        "{}_{}.{}",
        safe_id,
        file_date_label(day),
        extension_for(content_type)
    )
}

/// A file name this store will accept: one path segment, no traversal
pub(crate) fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
