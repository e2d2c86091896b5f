//! Presence and range checks for readings.

use thiserror::Error;

use crate::reading::{Reading, ReadingField, is_field_safe};

/// Lowest plausible enclosure temperature (°C).
pub const MIN_TEMPERATURE_C: f64 = -10.0;

/// Highest plausible enclosure temperature (°C).
pub const MAX_TEMPERATURE_C: f64 = 60.0;

pub const MIN_HUMIDITY_PERCENT: f64 = 0.0;
pub const MAX_HUMIDITY_PERCENT: f64 = 100.0;

/// Why a reading was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidReading {
    /// A required field is absent (or empty, for text fields).
    #[error("missing field: {0}")]
    Missing(ReadingField),

    /// A text field contains the field delimiter or a line break.
    #[error("{0} contains a delimiter or line break")]
    UnsafeText(ReadingField),

    /// Timestamp is zero or negative.
    #[error("timestamp must be positive, got {0}")]
    NonPositiveTimestamp(i64),

    /// A numeric field lies outside its accepted range (NaN included).
    #[error("{field} out of range: {value}")]
    OutOfRange { field: ReadingField, value: f64 },
}

/// Check every field invariant, stopping at the first violation.
pub fn validate(reading: &Reading) -> Result<(), InvalidReading> {
    require_text(&reading.message_id, ReadingField::MessageId)?;
    require_text(&reading.from_address, ReadingField::FromAddress)?;

    let timestamp = reading
        .timestamp_millis
        .ok_or(InvalidReading::Missing(ReadingField::TimestampMillis))?;
    if timestamp <= 0 {
        return Err(InvalidReading::NonPositiveTimestamp(timestamp));
    }

    require_within(
        reading.temperature_c,
        ReadingField::TemperatureC,
        MIN_TEMPERATURE_C..=MAX_TEMPERATURE_C,
    )?;
    require_within(
        reading.humidity_percent,
        ReadingField::HumidityPercent,
        MIN_HUMIDITY_PERCENT..=MAX_HUMIDITY_PERCENT,
    )?;
    require_within(
        reading.weight_grams,
        ReadingField::WeightGrams,
        0.0..=f64::MAX,
    )?;

    require_text(&reading.primary_tag_id, ReadingField::PrimaryTagId)?;
    for tag in &reading.secondary_tag_ids {
        require_text(tag, ReadingField::SecondaryTagIds)?;
    }
    Ok(())
}

/// `true` when the reading satisfies every invariant and may be stored.
pub fn is_complete(reading: &Reading) -> bool {
    validate(reading).is_ok()
}

fn require_text(value: &str, field: ReadingField) -> Result<(), InvalidReading> {
    if value.is_empty() {
        return Err(InvalidReading::Missing(field));
    }
    if !is_field_safe(value) {
        return Err(InvalidReading::UnsafeText(field));
    }
    Ok(())
}

fn require_within(
    value: Option<f64>,
    field: ReadingField,
    range: std::ops::RangeInclusive<f64>,
) -> Result<(), InvalidReading> {
    let value = value.ok_or(InvalidReading::Missing(field))?;
    // RangeInclusive::contains is false for NaN.
    if !range.contains(&value) {
        return Err(InvalidReading::OutOfRange { field, value });
    }
    Ok(())
}
