//! Integration tests for serialized submissions
//!
//! Concurrent submissions for the same day must create exactly one date
//! column, contention must surface as "server busy" without mutation, and the
//! sheet lock must come back after a panic inside the critical section.

mod helpers;

use attn_common::db::init_database;
use attn_common::time::FixedClock;
use attn_svc::blob::{FolderBlobStore, MemoryBlobStore};
use attn_svc::lock::SheetLock;
use attn_svc::reconcile::{ReconciliationService, SubmitError};
use attn_svc::sheet::{HeaderCell, MemorySheetStore, SheetStore, SqliteSheetStore, PRESENT};
use helpers::*;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinSet;

const STUDENTS: [(&str, &str); 6] = [
    ("Alice", "A100"),
    ("Bob", "B200"),
    ("Chen", "C300"),
    ("Dana", "D400"),
    ("Erin", "E500"),
    ("Farah", "F600"),
];

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_submissions_create_one_column() {
    // The delay sits between reading the column count and appending, so two
    // unserialized writers would both append a column for the same day
    let sheets = MemorySheetStore::with_students("Attendance", &STUDENTS);
    let blobs = MemoryBlobStore::new();
    let service = Arc::new(service_with(
        Arc::new(SlowAppendStore::new(sheets.clone(), Duration::from_millis(25))),
        Arc::new(blobs.clone()),
        pi_day(),
        Duration::from_secs(10),
    ));

    let mut join_set = JoinSet::new();
    for (_, id) in STUDENTS {
        let service = Arc::clone(&service);
        join_set.spawn(async move { service.submit(&request(id, PNG_URI)).await });
    }

    let mut created = 0;
    while let Some(result) = join_set.join_next().await {
        let receipt = result.unwrap().unwrap();
        assert_eq!(receipt.col, 3);
        if receipt.column_created {
            created += 1;
        }
    }
    assert_eq!(created, 1);

    let grid = snapshot(&sheets).await;
    assert_eq!(grid.header.len(), 4);
    assert_eq!(grid.header[3], HeaderCell::text("3/14/2024"));
    for row in 1..=STUDENTS.len() {
        assert_eq!(grid.cell(row, 3), PRESENT, "row {row}");
    }
    assert_eq!(blobs.live().await.len(), STUDENTS.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_resubmissions_leave_one_live_photo() {
    let sheets = roster();
    let blobs = MemoryBlobStore::new();
    let service = Arc::new(service_with(
        Arc::new(sheets.clone()),
        Arc::new(blobs.clone()),
        pi_day(),
        Duration::from_secs(10),
    ));

    let mut join_set = JoinSet::new();
    for _ in 0..5 {
        let service = Arc::clone(&service);
        join_set.spawn(async move { service.submit(&request("A100", PNG_URI)).await });
    }
    while let Some(result) = join_set.join_next().await {
        result.unwrap().unwrap();
    }

    let live = blobs.live().await;
    assert_eq!(live.len(), 1);
    assert_eq!(blobs.trashed().await.len(), 4);
    let grid = snapshot(&sheets).await;
    assert!(grid.cell(1, 2).ends_with(&format!("{}/{}", live[0].id, live[0].name)));
}

#[tokio::test]
async fn test_waiter_times_out_while_holder_is_slow() {
    let sheets = roster();
    let blobs = MemoryBlobStore::new();
    let service = Arc::new(service_with(
        Arc::new(SlowAppendStore::new(sheets.clone(), Duration::from_millis(300))),
        Arc::new(blobs.clone()),
        pi_day(),
        Duration::from_millis(50),
    ));

    let holder = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.submit(&request("A100", PNG_URI)).await })
    };
    // Let the holder take the lock and park inside append_column
    tokio::time::sleep(Duration::from_millis(20)).await;

    let err = service.submit(&request("B200", PNG_URI)).await.unwrap_err();
    assert!(matches!(err, SubmitError::Busy { .. }));

    holder.await.unwrap().unwrap();
    let grid = snapshot(&sheets).await;
    assert_eq!(grid.cell(1, 3), PRESENT);
    assert_eq!(grid.cell(2, 3), "");
    assert_eq!(grid.cell(2, 2), "");
    assert!(service.lock().is_free());
}

#[tokio::test]
async fn test_panic_inside_critical_section_releases_lock() {
    let inner = roster();
    let blobs = MemoryBlobStore::new();
    let service = Arc::new(service_with(
        Arc::new(PanickingStore {
            inner: inner.clone(),
        }),
        Arc::new(blobs),
        pi_day(),
        Duration::from_millis(100),
    ));

    let task = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.submit(&request("A100", PNG_URI)).await })
    };
    assert!(task.await.unwrap_err().is_panic());
    assert!(service.lock().is_free());

    // Once the column exists the panicking path is not taken any more
    inner.push_header(HeaderCell::text("3/14/2024")).await;
    let receipt = service.submit(&request("A100", PNG_URI)).await.unwrap();
    assert!(!receipt.column_created);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_against_sqlite() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("attendance.db"))
        .await
        .unwrap();

    let sheets = SqliteSheetStore::new(pool, "Attendance");
    sheets.create_sheet().await.unwrap();
    for (name, id) in STUDENTS {
        sheets.append_row(name, id).await.unwrap();
    }

    let blobs = FolderBlobStore::new(
        temp_dir.path().join("Attendance_Selfies"),
        "http://127.0.0.1:5790",
    );
    blobs.ensure_folder().await.unwrap();

    let service = Arc::new(ReconciliationService::new(
        Arc::new(sheets.clone()),
        Arc::new(blobs),
        SheetLock::new(Duration::from_secs(10)),
        Arc::new(FixedClock(pi_day())),
    ));

    let mut join_set = JoinSet::new();
    for (_, id) in STUDENTS {
        let service = Arc::clone(&service);
        join_set.spawn(async move { service.submit(&request(id, JPEG_URI)).await });
    }
    while let Some(result) = join_set.join_next().await {
        let receipt = result.unwrap().unwrap();
        assert!(receipt
            .file_url
            .starts_with("http://127.0.0.1:5790/photos/"));
    }

    let grid = sheets.snapshot().await.unwrap();
    assert_eq!(
        grid.labels(),
        vec!["Name", "StudentId", "PhotoLink", "3/14/2024"]
    );
    for row in 1..=STUDENTS.len() {
        assert_eq!(grid.cell(row, 3), PRESENT, "row {row}");
        assert!(grid.cell(row, 2).ends_with("_3-14-2024.jpg"));
    }
}
