//! The applied-versions log and the exclusive lock a run holds on it.

use async_trait::async_trait;
use schemigrate_schema::persist::{read_json, write_json};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::definitions::AppliedRecord;
use crate::error::{MigrationError, MigrationResult};

/// Durable, append/remove-last log of applied migrations
#[async_trait]
pub trait AppliedLog: Send + Sync {
    /// All records, oldest first
    async fn records(&self) -> MigrationResult<Vec<AppliedRecord>>;

    async fn append(&mut self, record: AppliedRecord) -> MigrationResult<()>;

    /// Drop the newest record and return it
    async fn remove_last(&mut self) -> MigrationResult<Option<AppliedRecord>>;

    /// Take exclusive access for one run; released when the guard drops
    async fn acquire(&self) -> MigrationResult<LogLock>;
}

/// Guard for [`AppliedLog::acquire`]
#[derive(Debug)]
pub struct LogLock {
    release: Release,
}

#[derive(Debug)]
enum Release {
    File(PathBuf),
    Flag(Arc<AtomicBool>),
}

impl Drop for LogLock {
    fn drop(&mut self) {
        match &self.release {
            Release::File(path) => {
                if let Err(e) = std::fs::remove_file(path) {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to remove migration lock"
                    );
                }
            }
            Release::Flag(held) => held.store(false, Ordering::Release),
        }
    }
}

/// Log kept in memory. Clones share the lock but not the records.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    records: Vec<AppliedRecord>,
    held: Arc<AtomicBool>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<AppliedRecord>) -> Self {
        Self {
            records,
            held: Arc::default(),
        }
    }
}

#[async_trait]
impl AppliedLog for MemoryLog {
    async fn records(&self) -> MigrationResult<Vec<AppliedRecord>> {
        Ok(self.records.clone())
    }

    async fn append(&mut self, record: AppliedRecord) -> MigrationResult<()> {
        self.records.push(record);
        Ok(())
    }

    async fn remove_last(&mut self) -> MigrationResult<Option<AppliedRecord>> {
        Ok(self.records.pop())
    }

    async fn acquire(&self) -> MigrationResult<LogLock> {
        if self
            .held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(MigrationError::Locked {
                path: PathBuf::from("<memory>"),
            });
        }
        Ok(LogLock {
            release: Release::Flag(Arc::clone(&self.held)),
        })
    }
}

/// Log stored as a JSON array next to a `<log>.lock` file used for mutual exclusion.
///
/// Every read goes to disk, so two processes never work from a stale copy.
#[derive(Debug, Clone)]
pub struct JsonFileLog {
    path: PathBuf,
}

impl JsonFileLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".lock");
        PathBuf::from(name)
    }

    async fn write(&self, records: &[AppliedRecord]) -> MigrationResult<()> {
        write_json(&self.path, &records)
            .await
            .map_err(MigrationError::Log)
    }
}

#[async_trait]
impl AppliedLog for JsonFileLog {
    async fn records(&self) -> MigrationResult<Vec<AppliedRecord>> {
        Ok(read_json(&self.path)
            .await
            .map_err(MigrationError::Log)?
            .unwrap_or_default())
    }

    async fn append(&mut self, record: AppliedRecord) -> MigrationResult<()> {
        let mut records = self.records().await?;
        records.push(record);
        self.write(&records).await
    }

    async fn remove_last(&mut self) -> MigrationResult<Option<AppliedRecord>> {
        let mut records = self.records().await?;
        let last = records.pop();
        if last.is_some() {
            self.write(&records).await?;
        }
        Ok(last)
    }

    async fn acquire(&self) -> MigrationResult<LogLock> {
        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MigrationError::io(parent, e))?;
        }

        let opened = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .await;
        match opened {
            Ok(_) => Ok(LogLock {
                release: Release::File(lock_path),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(MigrationError::Locked { path: lock_path })
            }
            Err(e) => Err(MigrationError::io(lock_path, e)),
        }
    }
}
