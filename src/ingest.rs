//! Ingestion Layer
//!
//! Turns one webhook call, possibly carrying several newline-separated
//! readings, into zero or more guarded appends and a fixed acknowledgement.
//!
//! # Components
//!
//! - [`RawPayload`]: Optional message id, sender and body handed over by the transport
//! - [`Ingestor`]: Per-call state machine (split → parse → validate → guard → append → acknowledge)
//! - [`ReadingSink`]: Append seam, implemented by [`StoreWriter`](crate::storage::StoreWriter)

mod controller;
mod payload;

pub use controller::{ACKNOWLEDGEMENT, CallStatus, IngestReport, Ingestor, ReadingSink};
pub use payload::RawPayload;
