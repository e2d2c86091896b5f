//! User-facing storage facades.
//!
//! - `StoreWriter`: Blocking appends routed through the writer actor
//! - `StoreReader`: Full history reads and export snapshots, straight from the file
//! - `Snapshot`: Handle to the live store file at a point in time

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, SyncSender};

use chrono::{DateTime, Utc};

use crate::reading::{Reading, parse};
use crate::storage::StorageError;
use crate::storage::actor::Command;

// =============================================================================
// Writer
// =============================================================================

/// Append facade. Clone freely; all clones feed the same actor.
///
/// Every method blocks until the actor answers. Call from
/// `tokio::task::spawn_blocking` when inside an async context.
#[derive(Clone)]
pub struct StoreWriter {
    tx: SyncSender<Command>,
    failed_appends: Arc<AtomicU64>,
}

impl std::fmt::Debug for StoreWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreWriter").finish_non_exhaustive()
    }
}

impl StoreWriter {
    pub(crate) fn new(tx: SyncSender<Command>) -> Self {
        Self {
            tx,
            failed_appends: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of appends that returned an error since startup.
    pub fn failed_appends(&self) -> u64 {
        self.failed_appends.load(Ordering::Relaxed)
    }

    /// Guard-check the store and append one reading as one line.
    pub fn append(&self, reading: Reading) -> Result<(), StorageError> {
        let result = self.request(|reply| Command::Append { reading, reply });
        if result.is_err() {
            self.failed_appends.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    /// Run the storage guard without writing anything.
    pub fn check(&self) -> Result<(), StorageError> {
        self.request(|reply| Command::Check { reply })
    }

    pub(crate) fn shutdown(&self) -> Result<(), StorageError> {
        self.tx
            .send(Command::Shutdown)
            .map_err(|_| StorageError::ChannelSend)
    }

    fn request(
        &self,
        make: impl FnOnce(mpsc::Sender<Result<(), StorageError>>) -> Command,
    ) -> Result<(), StorageError> {
        let (reply, rx) = mpsc::channel();
        self.tx
            .send(make(reply))
            .map_err(|_| StorageError::ChannelSend)?;
        rx.recv().map_err(|_| StorageError::NoReply)?
    }
}

// =============================================================================
// Reader
// =============================================================================

/// Read-only facade over the store file.
#[derive(Clone)]
pub struct StoreReader {
    path: Arc<PathBuf>,
}

impl std::fmt::Debug for StoreReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreReader")
            .field("path", &self.path)
            .finish()
    }
}

impl StoreReader {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
        }
    }

    /// Path of the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full history in insertion order.
    ///
    /// Lines that are not UTF-8 or do not parse (e.g. a line torn by a crash
    /// mid-append) are skipped. A store that does not exist yet reads as empty.
    pub fn read_all(&self) -> Result<Vec<Reading>, StorageError> {
        let file = match File::open(self.path.as_path()) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut readings = Vec::new();
        let mut skipped = 0usize;

        for (index, raw) in BufReader::new(file).split(b'\n').enumerate() {
            let raw = raw?;
            let Ok(line) = String::from_utf8(raw) else {
                tracing::debug!(line = index + 1, "Skipping non-UTF-8 store line");
                skipped += 1;
                continue;
            };

            match parse(line.trim_end_matches('\r')) {
                Ok(reading) => readings.push(reading),
                Err(e) => {
                    tracing::debug!(line = index + 1, error = %e, "Skipping malformed store line");
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            tracing::warn!(
                path = %self.path.display(),
                skipped,
                read = readings.len(),
                "Skipped unreadable store lines"
            );
        }

        Ok(readings)
    }

    /// Handle to the live store file for export. Not a copy.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            path: (*self.path).clone(),
            taken_at: Utc::now(),
        }
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// The store as of `taken_at`, referenced by path.
///
/// Consumers read the file when they need it, so appends that land after
/// `taken_at` may or may not be included.
#[derive(Debug, Clone)]
pub struct Snapshot {
    path: PathBuf,
    taken_at: DateTime<Utc>,
}

impl Snapshot {
    /// Path of the live store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the snapshot handle was taken.
    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Read the current file contents.
    pub async fn read_bytes(&self) -> Result<Vec<u8>, StorageError> {
        Ok(tokio::fs::read(&self.path).await?)
    }
}
