//! Utility modules for goodjson.

pub mod datetime;

pub use datetime::{format_datetime_millis, parse_datetime_millis, DateTimeParseError};
