//! Storage-specific error types.
//!
//! All storage operations return [`StorageError`] on failure. Ingestion treats
//! every variant as call-fatal: the remaining lines of the call are dropped.

use std::path::PathBuf;

use strum_macros::{AsRefStr, Display};
use thiserror::Error;

/// Precondition checked by the storage guard, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum GuardStep {
    /// File exists, or was created empty.
    Exists,
    /// Path is a regular file (not a directory or special file).
    RegularFile,
    /// File can be opened for reading.
    Readable,
    /// File can be opened for appending.
    Writable,
}

/// Errors that can occur in the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A guard precondition failed; the store must not be touched.
    #[error("storage unavailable at '{path}' ({step}): {detail}")]
    Unavailable {
        path: PathBuf,
        step: GuardStep,
        detail: String,
    },

    /// Reading or appending failed at the file layer.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to send command to writer actor.
    #[error("failed to send command to writer actor")]
    ChannelSend,

    /// Writer actor dropped the reply channel without answering.
    #[error("writer actor did not reply")]
    NoReply,

    /// Internal error (e.g., thread join failure).
    #[error("internal error: {0}")]
    Internal(String),
}

impl StorageError {
    pub(crate) fn unavailable(
        path: impl Into<PathBuf>,
        step: GuardStep,
        detail: impl std::fmt::Display,
    ) -> Self {
        Self::Unavailable {
            path: path.into(),
            step,
            detail: detail.to_string(),
        }
    }

    /// `true` for guard failures, as opposed to I/O failures during a write.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
