//! Sheet-wide critical section
//!
//! One submission at a time per backing store. Acquisition waits at most the
//! configured timeout and then fails with [`LockError::Busy`]; release happens
//! when the [`SheetGuard`] is dropped, which covers early returns, `?`
//! propagation and panics unwinding through the holder.

use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LockError {
    #[error("sheet lock not acquired within {waited:?}")]
    Busy { waited: Duration },
}

/// Process-wide advisory lock over one sheet store
#[derive(Clone)]
pub struct SheetLock {
    inner: Arc<Mutex<()>>,
    timeout: Duration,
}

impl SheetLock {
    pub fn new(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(())),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait up to the configured timeout for exclusive access
    pub async fn acquire(&self) -> Result<SheetGuard, LockError> {
        let started = Instant::now();
        match tokio::time::timeout(self.timeout, self.inner.clone().lock_owned()).await {
            Ok(guard) => {
                let waited = started.elapsed();
                debug!(waited_ms = waited.as_millis() as u64, "Sheet lock acquired");
                Ok(SheetGuard {
                    _guard: guard,
                    acquired_at: Instant::now(),
                })
            }
            Err(_) => Err(LockError::Busy {
                waited: started.elapsed(),
            }),
        }
    }

    /// True when nobody holds the lock right now
    pub fn is_free(&self) -> bool {
        self.inner.try_lock().is_ok()
    }
}

/// Exclusive access to the sheet; released on drop
pub struct SheetGuard {
    _guard: OwnedMutexGuard<()>,
    acquired_at: Instant,
}

impl Drop for SheetGuard {
    fn drop(&mut self) {
        debug!(
            held_ms = self.acquired_at.elapsed().as_millis() as u64,
            "Sheet lock released"
        );
    }
}
