//! Shared fixtures for attn-svc integration tests

#![allow(dead_code)]

pub mod fault_injection;

use attn_common::time::FixedClock;
use attn_svc::blob::{BlobStore, MemoryBlobStore};
use attn_svc::lock::SheetLock;
use attn_svc::reconcile::{ReconciliationService, SubmissionRequest};
use attn_svc::sheet::{MemorySheetStore, SheetSnapshot, SheetStore};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

pub use fault_injection::{FaultyBlobStore, PanickingStore, SlowAppendStore};

/// 8-byte PNG signature as a data URI
pub const PNG_URI: &str = "data:image/png;base64,iVBORw0KGgo=";

/// Minimal JPEG start-of-image marker as a data URI
pub const JPEG_URI: &str = "data:image/jpeg;base64,/9j/4AAQ";

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn pi_day() -> NaiveDate {
    day(2024, 3, 14)
}

pub fn request(student_id: &str, image: &str) -> SubmissionRequest {
    SubmissionRequest {
        student_id: student_id.to_string(),
        image: image.to_string(),
        student_name: None,
        mentor: None,
    }
}

pub fn roster() -> MemorySheetStore {
    MemorySheetStore::with_students(
        "Attendance",
        &[("Alice", "A100"), ("Bob", "B200"), ("Chen", "C300")],
    )
}

pub fn service_with(
    sheets: Arc<dyn SheetStore>,
    blobs: Arc<dyn BlobStore>,
    today: NaiveDate,
    lock_timeout: Duration,
) -> ReconciliationService {
    ReconciliationService::new(
        sheets,
        blobs,
        SheetLock::new(lock_timeout),
        Arc::new(FixedClock(today)),
    )
}

pub fn service(
    sheets: &MemorySheetStore,
    blobs: &MemoryBlobStore,
    today: NaiveDate,
) -> ReconciliationService {
    service_with(
        Arc::new(sheets.clone()),
        Arc::new(blobs.clone()),
        today,
        Duration::from_millis(200),
    )
}

pub async fn snapshot(sheets: &MemorySheetStore) -> SheetSnapshot {
    sheets.snapshot().await.unwrap()
}
