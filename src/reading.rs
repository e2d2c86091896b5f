//! Reading Layer
//!
//! Typed sensor readings and the pure text codec that turns one delimited
//! line into a [`Reading`] and back.
//!
//! # Components
//!
//! - [`Reading`]: One sensor observation (time, temperature, humidity, weight, tags)
//! - [`parse`] / [`format_line`]: Line codec shared by the webhook and the store file
//! - [`validate`] / [`is_complete`]: Presence and range checks applied before persistence

mod parser;
mod types;
mod validator;

pub use parser::{FIELD_DELIMITER, ParseError, format_line, is_field_safe, parse};
pub use types::{Reading, ReadingField};
pub use validator::{
    InvalidReading, MAX_HUMIDITY_PERCENT, MAX_TEMPERATURE_C, MIN_HUMIDITY_PERCENT,
    MIN_TEMPERATURE_C, is_complete, validate,
};
