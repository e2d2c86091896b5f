//! Storage guard: preconditions checked before every append.
//!
//! The result is never cached. External tooling (backup jobs, an operator
//! moving the file aside) can change the store between two appends.

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::Path;

use crate::storage::{GuardStep, StorageError};

/// Verify the store file is present and usable, creating it empty if missing.
///
/// Steps run in order and the first failure is returned:
/// exists (one creation attempt), regular file, readable, writable.
pub fn ensure_writable(path: &Path) -> Result<(), StorageError> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            create_empty(path)?;
            fs::metadata(path).map_err(|e| StorageError::unavailable(path, GuardStep::Exists, e))?
        }
        Err(e) => return Err(StorageError::unavailable(path, GuardStep::Exists, e)),
    };

    if !metadata.is_file() {
        return Err(StorageError::unavailable(
            path,
            GuardStep::RegularFile,
            "not a regular file",
        ));
    }

    File::open(path).map_err(|e| StorageError::unavailable(path, GuardStep::Readable, e))?;

    OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| StorageError::unavailable(path, GuardStep::Writable, e))?;

    Ok(())
}

/// Single creation attempt; losing a race to another creator counts as success.
fn create_empty(path: &Path) -> Result<(), StorageError> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(_) => {
            tracing::info!(path = %path.display(), "Created empty store file");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(StorageError::unavailable(path, GuardStep::Exists, e)),
    }
}
