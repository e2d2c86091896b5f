//! Storage Layer
//!
//! Append-only flat-file store for the reading history, with a single writer
//! and lock-free readers:
//! - **Writer**: Dedicated thread owning every append, fed by a bounded MPSC channel
//! - **Reader**: Opens its own read-only handle per call
//!
//! The store file is never truncated, rewritten or seeked. A crash mid-append
//! can at worst leave one torn trailing line, which readers skip.
//!
//! # Components
//!
//! - [`StoreWriter`]: Guarded, serialized appends
//! - [`StoreReader`]: Full history reads and [`Snapshot`] handles for export
//! - [`ensure_writable`]: Storage guard run before every append
//! - [`StorageBuilder`] / [`StorageHandles`]: Initialization and lifecycle management

mod actor;
mod builder;
mod error;
mod facades;
mod guard;

pub use actor::LINE_SEPARATOR;
pub use builder::{DEFAULT_CHANNEL_CAPACITY, StorageBuilder, StorageHandles};
pub use error::{GuardStep, StorageError};
pub use facades::{Snapshot, StoreReader, StoreWriter};
pub use guard::ensure_writable;
