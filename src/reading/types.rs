//! Core reading types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// One sensor observation relayed by the basking station.
///
/// Numeric fields are `None` when the sender's value could not be parsed.
/// Absence is only rejected later, by [`validate`](crate::reading::validate),
/// so a syntactically well-formed line never fails at parse time because of a
/// bad number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Opaque id assigned by the SMS gateway (e.g. a Twilio `MessageSid`).
    pub message_id: String,
    /// Sender address (the station's phone number).
    pub from_address: String,
    /// Observation time, milliseconds since the Unix epoch.
    pub timestamp_millis: Option<i64>,
    /// Enclosure temperature in degrees Celsius.
    pub temperature_c: Option<f64>,
    /// Relative humidity in percent.
    pub humidity_percent: Option<f64>,
    /// Scale reading in grams.
    pub weight_grams: Option<f64>,
    /// RFID tag of the animal on the scale.
    pub primary_tag_id: String,
    /// Further RFID tags seen in the same window, in read order.
    #[serde(default)]
    pub secondary_tag_ids: Vec<String>,
}

impl Reading {
    /// Observation time as a UTC date-time, if the timestamp is present and representable.
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp_millis
            .and_then(DateTime::<Utc>::from_timestamp_millis)
    }
}

/// Names of the reading fields, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ReadingField {
    MessageId,
    FromAddress,
    TimestampMillis,
    TemperatureC,
    HumidityPercent,
    WeightGrams,
    PrimaryTagId,
    SecondaryTagIds,
}
