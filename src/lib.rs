//! Basking Relay - SMS Telemetry Ingest
//!
//! Receives sensor readings relayed by SMS from basking stations (temperature,
//! humidity, weight and RFID tags), keeps every valid reading in an
//! append-only CSV store and hands a copy of that store to an upload target
//! once a day.
//!
//! # Architecture
//!
//! - **Reading**: Line parser, schema and range validation
//! - **Ingest**: Webhook payload handling, one fixed acknowledgement per call
//! - **Storage**: Guarded append-only store behind a single writer thread
//! - **Export**: Daily snapshot upload on a cron schedule
//! - **Presentation**: HTML report, JSON feed and health checks
//!
//! # Example
//!
//! ```rust,no_run
//! use basking_relay::{Ingestor, RawPayload, StorageBuilder};
//!
//! let handles = StorageBuilder::new("SBSBS.csv").build()?;
//! let ingestor = Ingestor::new(handles.writer.clone());
//!
//! let report = ingestor.ingest(RawPayload::new(
//!     "SM1",
//!     "+441234",
//!     "1548460799000,21.5,55.0,312.4,TAG001\n",
//! ));
//! assert_eq!(report.appended, 1);
//!
//! handles.shutdown()?;
//! # Ok::<(), basking_relay::StorageError>(())
//! ```

pub mod config;
pub mod export;
pub mod ingest;
pub mod reading;
pub mod report;
pub mod server;
pub mod storage;

// Re-export commonly used types
pub use export::{DailySchedule, ExportError, ExportScheduler, SnapshotUploader};
pub use ingest::{ACKNOWLEDGEMENT, IngestReport, Ingestor, RawPayload};
pub use reading::{Reading, is_complete, parse};
pub use storage::{StorageBuilder, StorageError, StorageHandles, StoreReader, StoreWriter};
