//! Fault injection wrappers around the in-memory stores
//!
//! Each wrapper delegates to a real store and adds one failure mode: a panic,
//! a widened race window, a slow write or a refused trash.

use async_trait::async_trait;
use attn_svc::blob::{BlobContent, BlobError, BlobStore, MemoryBlobStore, StoredBlob};
use attn_svc::sheet::{MemorySheetStore, SheetSnapshot, SheetStore, StorageResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Sheet store that panics whenever a date column would be appended
pub struct PanickingStore {
    pub inner: MemorySheetStore,
}

#[async_trait]
impl SheetStore for PanickingStore {
    fn sheet_name(&self) -> &str {
        self.inner.sheet_name()
    }

    async fn snapshot(&self) -> StorageResult<SheetSnapshot> {
        self.inner.snapshot().await
    }

    async fn append_column(&self, _header: &str) -> StorageResult<usize> {
        panic!("backend exploded while appending a column");
    }

    async fn write_cell(&self, row: usize, col: usize, value: &str) -> StorageResult<()> {
        self.inner.write_cell(row, col, value).await
    }

    async fn append_row(&self, name: &str, student_id: &str) -> StorageResult<usize> {
        self.inner.append_row(name, student_id).await
    }
}

/// Sheet store that sleeps between reading the header width and appending
///
/// Two unserialized writers would both see the same width and both append a
/// column for the same day.
pub struct SlowAppendStore {
    pub inner: MemorySheetStore,
    pub delay: Duration,
}

impl SlowAppendStore {
    pub fn new(inner: MemorySheetStore, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl SheetStore for SlowAppendStore {
    fn sheet_name(&self) -> &str {
        self.inner.sheet_name()
    }

    async fn snapshot(&self) -> StorageResult<SheetSnapshot> {
        self.inner.snapshot().await
    }

    async fn append_column(&self, header: &str) -> StorageResult<usize> {
        let width = self.inner.snapshot().await?.header.len();
        tokio::time::sleep(self.delay).await;
        let col = self.inner.append_column(header).await?;
        assert_eq!(col, width, "column appended by someone else mid-write");
        Ok(col)
    }

    async fn write_cell(&self, row: usize, col: usize, value: &str) -> StorageResult<()> {
        self.inner.write_cell(row, col, value).await
    }

    async fn append_row(&self, name: &str, student_id: &str) -> StorageResult<usize> {
        self.inner.append_row(name, student_id).await
    }
}

/// Photo store with a refusable trash and an optional slow create
pub struct FaultyBlobStore {
    pub inner: MemoryBlobStore,
    fail_trash: AtomicBool,
    create_delay: Option<Duration>,
    trash_attempts: Mutex<Vec<String>>,
}

impl FaultyBlobStore {
    pub fn new(inner: MemoryBlobStore) -> Self {
        Self {
            inner,
            fail_trash: AtomicBool::new(false),
            create_delay: None,
            trash_attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    /// Make every subsequent `trash` call fail
    pub fn fail_trash(&self, fail: bool) {
        self.fail_trash.store(fail, Ordering::SeqCst);
    }

    /// Links passed to `trash`, in call order
    pub async fn trash_attempts(&self) -> Vec<String> {
        self.trash_attempts.lock().await.clone()
    }
}

#[async_trait]
impl BlobStore for FaultyBlobStore {
    fn owns(&self, url: &str) -> bool {
        self.inner.owns(url)
    }

    async fn create(
        &self,
        name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredBlob, BlobError> {
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.create(name, content_type, bytes).await
    }

    async fn trash(&self, url: &str) -> Result<(), BlobError> {
        self.trash_attempts.lock().await.push(url.to_string());
        if self.fail_trash.load(Ordering::SeqCst) {
            return Err(BlobError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "trash refused",
            )));
        }
        self.inner.trash(url).await
    }

    async fn open(&self, id: &str, name: &str) -> Result<BlobContent, BlobError> {
        self.inner.open(id, name).await
    }
}
