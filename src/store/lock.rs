use fd_lock::{RwLock, RwLockWriteGuard};
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;

use super::StoreError;

const RETRY_INTERVAL: Duration = Duration::from_millis(20);

pub type StateGuard<'a> = RwLockWriteGuard<'a, File>;

/// Advisory single-writer lock on the state document
///
/// The state document is overwritten wholesale, so two writers would lose
/// each other's updates. Hold the guard across one load-modify-persist
/// sequence and drop it straight after, so a running monitor and an operator
/// command can take turns.
///
/// ```rust,no_run
/// # use audit_handoff::store::StateLock;
/// # use std::time::Duration;
/// # async fn run() -> Result<(), audit_handoff::store::StoreError> {
/// let mut lock = StateLock::open(std::path::Path::new(".handoff/events/executor-state.json.lock"))?;
/// let _guard = lock.acquire(Duration::from_secs(5)).await?;
/// // ... load, mutate and persist state ...
/// # Ok(())
/// # }
/// ```
pub struct StateLock {
    path: std::path::PathBuf,
    lock: RwLock<File>,
}

impl StateLock {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            lock: RwLock::new(file),
        })
    }

    /// Take the write lock without blocking
    pub fn try_write(&mut self) -> Result<StateGuard<'_>, StoreError> {
        let path = self.path.clone();
        self.lock
            .try_write()
            .map_err(|_| StoreError::LockContended { path })
    }

    /// Take the write lock, retrying until `timeout` has passed
    pub async fn acquire(&mut self, timeout: Duration) -> Result<StateGuard<'_>, StoreError> {
        let deadline = Instant::now() + timeout;
        while self.lock.try_write().is_err() {
            if Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(RETRY_INTERVAL).await;
        }
        self.try_write()
    }
}
