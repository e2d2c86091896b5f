//! Export Layer
//!
//! Once a day, hands a snapshot of the live store file to an upload
//! collaborator. Export never blocks or fails ingestion.
//!
//! # Components
//!
//! - [`DailySchedule`]: Fixed UTC time of day, re-armed every 24 hours
//! - [`ExportScheduler`]: Cron job wiring and lifecycle
//! - [`SnapshotUploader`]: Upload seam, with [`DirectoryUploader`] and [`HttpUploader`]

mod schedule;
mod scheduler;
mod uploader;

use std::path::PathBuf;

use thiserror::Error;

use crate::storage::StorageError;

pub use schedule::DailySchedule;
pub use scheduler::{DEFAULT_SHUTDOWN_TIMEOUT, ExportScheduler, run_export};
pub use uploader::{
    DEFAULT_UPLOAD_TIMEOUT, DirectoryUploader, HttpUploader, SnapshotUploader, export_name,
};

/// Errors that can occur while exporting a snapshot.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The store file has not been created yet.
    #[error("snapshot file missing: {0}")]
    MissingSnapshot(PathBuf),

    /// Local file I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Reading the snapshot through the storage layer failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// HTTP transport failed.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote side answered with a non-success status.
    #[error("upload to {url} rejected with status {status}")]
    Status { url: String, status: u16 },

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Scheduler error.
    #[error("scheduler error: {0}")]
    Scheduler(String),
}
