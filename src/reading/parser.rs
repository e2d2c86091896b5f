//! Line codec for readings.
//!
//! Two line shapes share the `message_id,from_address` prefix:
//!
//! - canonical (7+ fields): `timestamp,temperature,humidity,weight,primary_tag[,secondary_tag...]`
//! - legacy (exactly 6 fields): `timestamp,primary_tag,temperature,weight`
//!
//! Legacy lines come from the first station firmware, which had no humidity
//! sensor. They stay readable so old store files render, but never validate.

use chrono::DateTime;
use thiserror::Error;

use crate::reading::Reading;

/// Separator between fields on a line.
pub const FIELD_DELIMITER: char = ',';

/// Characters that cannot appear inside a stored field: the delimiter and
/// anything a reader would take as a line break.
const FORBIDDEN_IN_FIELD: [char; 3] = [FIELD_DELIMITER, '\r', '\n'];

/// `true` when `value` can be written as one field without shifting columns
/// or splitting the line.
pub fn is_field_safe(value: &str) -> bool {
    !value.contains(FORBIDDEN_IN_FIELD)
}

/// Number of identity fields (`message_id`, `from_address`) in front of the sensor block.
const PREFIX_FIELDS: usize = 2;

/// Fields in the canonical sensor block (timestamp, temperature, humidity, weight, primary tag).
const CANONICAL_SENSOR_FIELDS: usize = 5;

/// Fields in the legacy sensor block (timestamp, tag, temperature, weight).
const LEGACY_SENSOR_FIELDS: usize = 4;

const CANONICAL_MIN_FIELDS: usize = PREFIX_FIELDS + CANONICAL_SENSOR_FIELDS;
const LEGACY_FIELDS: usize = PREFIX_FIELDS + LEGACY_SENSOR_FIELDS;

/// Errors produced while splitting a line into fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Field count matches neither line shape.
    #[error("malformed payload: expected at least {expected} fields, found {found}")]
    MalformedPayload { expected: usize, found: usize },
}

/// Parse one delimited line into a [`Reading`].
///
/// Numeric fields that fail conversion are left as `None`; only the field
/// count can make parsing fail.
pub fn parse(line: &str) -> Result<Reading, ParseError> {
    let fields: Vec<&str> = line.split(FIELD_DELIMITER).map(str::trim).collect();

    if fields.len() >= CANONICAL_MIN_FIELDS {
        Ok(Reading {
            message_id: fields[0].to_string(),
            from_address: fields[1].to_string(),
            timestamp_millis: parse_timestamp(fields[2]),
            temperature_c: parse_decimal(fields[3]),
            humidity_percent: parse_decimal(fields[4]),
            weight_grams: parse_decimal(fields[5]),
            primary_tag_id: fields[6].to_string(),
            secondary_tag_ids: fields[CANONICAL_MIN_FIELDS..]
                .iter()
                .filter(|tag| !tag.is_empty())
                .map(|tag| tag.to_string())
                .collect(),
        })
    } else if fields.len() == LEGACY_FIELDS {
        Ok(Reading {
            message_id: fields[0].to_string(),
            from_address: fields[1].to_string(),
            timestamp_millis: parse_timestamp(fields[2]),
            temperature_c: parse_decimal(fields[4]),
            humidity_percent: None,
            weight_grams: parse_decimal(fields[5]),
            primary_tag_id: fields[3].to_string(),
            secondary_tag_ids: Vec::new(),
        })
    } else {
        Err(ParseError::MalformedPayload {
            expected: LEGACY_FIELDS,
            found: fields.len(),
        })
    }
}

/// Serialize a reading in canonical field order, without a line terminator.
///
/// Absent numeric fields are written as empty fields.
pub fn format_line(reading: &Reading) -> String {
    let mut fields = vec![
        reading.message_id.clone(),
        reading.from_address.clone(),
        format_optional(reading.timestamp_millis),
        format_optional(reading.temperature_c),
        format_optional(reading.humidity_percent),
        format_optional(reading.weight_grams),
        reading.primary_tag_id.clone(),
    ];
    fields.extend(reading.secondary_tag_ids.iter().cloned());
    fields.join(&FIELD_DELIMITER.to_string())
}

fn format_optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Epoch milliseconds, or an RFC 3339 date-time converted to epoch milliseconds.
fn parse_timestamp(field: &str) -> Option<i64> {
    field.parse::<i64>().ok().or_else(|| {
        DateTime::parse_from_rfc3339(field)
            .ok()
            .map(|dt| dt.timestamp_millis())
    })
}

fn parse_decimal(field: &str) -> Option<f64> {
    field.parse::<f64>().ok()
}
