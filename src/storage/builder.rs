//! Storage builder and handles.
//!
//! Provides a builder pattern for constructing the storage layer
//! and a handles struct for accessing all storage facades.

use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use crate::storage::StorageError;
use crate::storage::actor::StoreActor;
use crate::storage::{StoreReader, StoreWriter};

/// Default channel capacity for writer commands.
///
/// Each ingestion call waits for its own append before sending the next, so
/// this bounds the number of concurrently blocked webhook calls.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1_024;

/// Builder for constructing the storage layer.
pub struct StorageBuilder {
    store_path: PathBuf,
    channel_capacity: usize,
}

impl StorageBuilder {
    /// Create a new storage builder for the store file at `store_path`.
    pub fn new(store_path: impl AsRef<Path>) -> Self {
        Self {
            store_path: store_path.as_ref().to_path_buf(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Set the channel capacity for writer commands.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Build the storage layer and return handles.
    ///
    /// The store file itself is not created here; the guard creates it on
    /// the first append.
    pub fn build(self) -> Result<StorageHandles, StorageError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = self.store_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Internal(format!(
                    "Failed to create store directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let (actor_handle, tx) = StoreActor::spawn(&self.store_path, self.channel_capacity)?;

        Ok(StorageHandles {
            writer: StoreWriter::new(tx),
            reader: StoreReader::new(self.store_path),
            actor_handle: Some(actor_handle),
        })
    }
}

/// Handles to all storage layer facades.
pub struct StorageHandles {
    /// Append facade (routes through the writer actor).
    pub writer: StoreWriter,
    /// Read facade for history and snapshots.
    pub reader: StoreReader,
    /// Internal actor handle for graceful shutdown.
    actor_handle: Option<JoinHandle<()>>,
}

impl StorageHandles {
    /// Gracefully shutdown the storage layer.
    ///
    /// Sends shutdown command to the writer actor and waits for it to finish.
    pub fn shutdown(mut self) -> Result<(), StorageError> {
        self.writer.shutdown()?;

        if let Some(handle) = self.actor_handle.take() {
            handle
                .join()
                .map_err(|_| StorageError::Internal("Failed to join actor thread".to_string()))?;
        }

        Ok(())
    }
}

impl Drop for StorageHandles {
    fn drop(&mut self) {
        // Try graceful shutdown if not already done
        if self.actor_handle.is_some() {
            let _ = self.writer.shutdown();
            if let Some(handle) = self.actor_handle.take() {
                let _ = handle.join();
            }
        }
    }
}
