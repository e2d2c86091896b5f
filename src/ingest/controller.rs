//! Ingestion controller: one webhook call in, one fixed acknowledgement out.

use std::sync::Arc;

use crate::ingest::RawPayload;
use crate::reading::{FIELD_DELIMITER, Reading, parse, validate};
use crate::storage::{StorageError, StoreWriter};

/// Reply sent for every webhook call: an empty TwiML response, so the
/// gateway sends nothing back to the station.
pub const ACKNOWLEDGEMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Response/>"#;

/// Destination for validated readings.
///
/// Any error returned is treated as call-fatal.
pub trait ReadingSink: Send + Sync + 'static {
    fn append(&self, reading: Reading) -> Result<(), StorageError>;
}

impl ReadingSink for StoreWriter {
    fn append(&self, reading: Reading) -> Result<(), StorageError> {
        StoreWriter::append(self, reading)
    }
}

/// How a call ended. Local diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallStatus {
    /// Every candidate line was processed.
    #[default]
    Completed,
    /// Message id, sender or body missing; nothing was parsed.
    IncompletePayload,
    /// Storage guard or append failed; remaining lines were dropped.
    StorageAborted,
}

/// Per-call tally of what happened to each candidate line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub candidates: usize,
    pub appended: usize,
    pub malformed: usize,
    pub invalid: usize,
    /// Lines never attempted because the call was aborted.
    pub abandoned: usize,
    pub status: CallStatus,
}

/// Drives parse, validate, guard and append for every line of a call.
#[derive(Clone)]
pub struct Ingestor {
    sink: Arc<dyn ReadingSink>,
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor").finish_non_exhaustive()
    }
}

impl Ingestor {
    pub fn new(sink: impl ReadingSink) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// Process one call and return the fixed acknowledgement.
    ///
    /// Blocks on storage I/O.
    pub fn handle(&self, payload: RawPayload) -> &'static str {
        self.ingest(payload);
        ACKNOWLEDGEMENT
    }

    /// Process one call and report the per-line outcome.
    ///
    /// Line-level failures (malformed, invalid) skip only that line. A storage
    /// failure abandons the rest of the call.
    pub fn ingest(&self, payload: RawPayload) -> IngestReport {
        let mut report = IngestReport::default();

        let Some((message_id, from_address, body)) = payload.into_parts() else {
            tracing::warn!("Webhook call missing message id, sender or body; ignored");
            report.status = CallStatus::IncompletePayload;
            return report;
        };

        let lines = candidate_lines(&message_id, &from_address, &body);
        report.candidates = lines.len();

        for (index, line) in lines.iter().enumerate() {
            let reading = match parse(line) {
                Ok(reading) => reading,
                Err(e) => {
                    tracing::debug!(message_id = %message_id, line = index + 1, error = %e, "Skipping malformed line");
                    report.malformed += 1;
                    continue;
                }
            };

            if let Err(e) = validate(&reading) {
                tracing::warn!(message_id = %message_id, line = index + 1, reason = %e, "Discarding invalid reading");
                report.invalid += 1;
                continue;
            }

            if let Err(e) = self.sink.append(reading) {
                report.abandoned = lines.len() - index - 1;
                report.status = CallStatus::StorageAborted;
                tracing::error!(
                    message_id = %message_id,
                    line = index + 1,
                    abandoned = report.abandoned,
                    error = %e,
                    "Storage failure, aborting remaining lines"
                );
                break;
            }
            report.appended += 1;
        }

        tracing::info!(
            message_id = %message_id,
            from = %from_address,
            candidates = report.candidates,
            appended = report.appended,
            malformed = report.malformed,
            invalid = report.invalid,
            abandoned = report.abandoned,
            "Webhook call processed"
        );
        report
    }
}

/// One candidate line per body segment, prefixed with the call's identity fields.
///
/// Segments end at `\r\n`, `\n` or a lone `\r`.
fn candidate_lines(message_id: &str, from_address: &str, body: &str) -> Vec<String> {
    body.split('\n')
        .flat_map(|line| line.strip_suffix('\r').unwrap_or(line).split('\r'))
        .map(str::trim)
        .map(|segment| {
            format!("{message_id}{FIELD_DELIMITER}{from_address}{FIELD_DELIMITER}{segment}")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Sink that records appends and can fail from the n-th append on.
    #[derive(Default)]
    struct RecordingSink {
        appended: Mutex<Vec<Reading>>,
        fail_from: Option<usize>,
    }

    impl ReadingSink for Arc<RecordingSink> {
        fn append(&self, reading: Reading) -> Result<(), StorageError> {
            let mut appended = self.appended.lock().unwrap();
            if self.fail_from.is_some_and(|n| appended.len() >= n) {
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            appended.push(reading);
            Ok(())
        }
    }

    fn ingestor(fail_from: Option<usize>) -> (Ingestor, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink {
            fail_from,
            ..Default::default()
        });
        (Ingestor::new(Arc::clone(&sink)), sink)
    }

    #[test]
    fn test_candidate_lines_prefix_and_trim() {
        let lines = candidate_lines("SM1", "+44", " 1000,21.5,55,312.4,TAG001 \r\n2000,22,56,300,TAG002");
        assert_eq!(
            lines,
            vec![
                "SM1,+44,1000,21.5,55,312.4,TAG001",
                "SM1,+44,2000,22,56,300,TAG002"
            ]
        );
    }

    #[test]
    fn test_candidate_lines_split_on_bare_carriage_return() {
        let lines = candidate_lines("SM1", "+44", "1000,21.5,55,312.4,TAG001\r2000,22,56,300,TAG002\r\n3000,23,57,301,TAG003");
        assert_eq!(
            lines,
            vec![
                "SM1,+44,1000,21.5,55,312.4,TAG001",
                "SM1,+44,2000,22,56,300,TAG002",
                "SM1,+44,3000,23,57,301,TAG003"
            ]
        );
    }

    #[test]
    fn test_bare_carriage_returns_keep_readings_separate() {
        let (ingestor, sink) = ingestor(None);
        let report = ingestor.ingest(RawPayload::new(
            "SM1",
            "+44",
            "1000,21.5,55,312.4,TAG001\r2000,22,56,300,TAG002",
        ));

        assert_eq!(report.appended, 2);
        let appended = sink.appended.lock().unwrap();
        assert!(appended.iter().all(|r| r.secondary_tag_ids.is_empty()));
        assert_eq!(appended[1].primary_tag_id, "TAG002");
    }

    #[test]
    fn test_line_break_in_identity_stores_nothing() {
        let (ingestor, sink) = ingestor(None);
        let report = ingestor.ingest(RawPayload::new(
            "SM1\nX",
            "+44",
            "1548460799000,21.5,55,312.4,TAG001",
        ));

        assert_eq!(report.status, CallStatus::IncompletePayload);
        assert_eq!(report.appended, 0);
        assert!(sink.appended.lock().unwrap().is_empty());
    }

    #[test]
    fn test_single_reading_with_trailing_blank_line() {
        let (ingestor, sink) = ingestor(None);
        let report = ingestor.ingest(RawPayload::new(
            "SM1",
            "+44",
            "2023-06-01T12:00:00Z,21.5,55.0,312.4,TAG001\n",
        ));

        assert_eq!(report.appended, 1);
        assert_eq!(report.malformed, 1);
        assert_eq!(report.status, CallStatus::Completed);
        let appended = sink.appended.lock().unwrap();
        assert_eq!(appended[0].primary_tag_id, "TAG001");
        assert_eq!(appended[0].message_id, "SM1");
    }

    #[test]
    fn test_mixed_batch_keeps_valid_lines_in_order() {
        let (ingestor, sink) = ingestor(None);
        let body = [
            "1000,21.5,55,312.4,TAG001",
            "1001,21.5,55",
            "1002,61,55,312.4,TAG002",
            "1003,22,56,300,TAG003,SK1",
            "1004,22,56,NaN,TAG004",
            "1005,-10,0,0,TAG005",
        ]
        .join("\n");

        let report = ingestor.ingest(RawPayload::new("SM1", "+44", body));

        assert_eq!(report.candidates, 6);
        assert_eq!(report.appended, 3);
        assert_eq!(report.malformed, 1);
        assert_eq!(report.invalid, 2);
        let tags: Vec<_> = sink
            .appended
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.primary_tag_id.clone())
            .collect();
        assert_eq!(tags, vec!["TAG001", "TAG003", "TAG005"]);
    }

    #[test]
    fn test_missing_fields_skip_processing() {
        let (ingestor, sink) = ingestor(None);
        let payload = RawPayload {
            message_id: Some("SM1".to_string()),
            from_address: None,
            body: Some("1000,21.5,55,312.4,TAG001".to_string()),
        };

        let report = ingestor.ingest(payload);

        assert_eq!(report.status, CallStatus::IncompletePayload);
        assert_eq!(report.candidates, 0);
        assert!(sink.appended.lock().unwrap().is_empty());
    }

    #[test]
    fn test_storage_failure_aborts_remaining_lines() {
        let (ingestor, sink) = ingestor(Some(1));
        let body = "1000,21.5,55,312.4,TAG001\n1001,21.5,55,312.4,TAG002\n1002,21.5,55,312.4,TAG003";

        let report = ingestor.ingest(RawPayload::new("SM1", "+44", body));

        assert_eq!(report.status, CallStatus::StorageAborted);
        assert_eq!(report.appended, 1);
        assert_eq!(report.abandoned, 1);
        assert_eq!(sink.appended.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_acknowledgement_is_uniform() {
        let (ok, _) = ingestor(None);
        let (failing, _) = ingestor(Some(0));

        let good = RawPayload::new("SM1", "+44", "1000,21.5,55,312.4,TAG001");
        assert_eq!(ok.handle(good.clone()), ACKNOWLEDGEMENT);
        assert_eq!(failing.handle(good), ACKNOWLEDGEMENT);
        assert_eq!(ok.handle(RawPayload::default()), ACKNOWLEDGEMENT);
        assert_eq!(ok.handle(RawPayload::new("SM1", "+44", "garbage")), ACKNOWLEDGEMENT);
    }
}
