//! Timestamp normalization
//!
//! Web server logs carry timestamps like `10/Oct/2023:13:55:36 -0700`. The store
//! expects RFC 3339 in UTC, so the `timestamp` field is rewritten in place to
//! `2023-10-10T20:55:36Z`.

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use crate::record::{FieldValue, Fields, TIMESTAMP_FIELD};

/// Apache/Nginx combined log format timestamp.
pub const SOURCE_LAYOUT: &str = "%d/%b/%Y:%H:%M:%S %z";

#[derive(Error, Debug)]
pub enum TimestampError {
    #[error("field 'timestamp' is missing")]
    Missing,

    #[error("field 'timestamp' is empty")]
    Empty,

    #[error("field 'timestamp' is not a string")]
    NotAString,

    #[error("'{value}' does not match the combined log layout: {source}")]
    Invalid {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Convert one combined-log timestamp to RFC 3339 UTC
pub fn convert(value: &str) -> Result<String, TimestampError> {
    let parsed = DateTime::parse_from_str(value.trim(), SOURCE_LAYOUT).map_err(|source| {
        TimestampError::Invalid {
            value: value.to_string(),
            source,
        }
    })?;

    Ok(parsed
        .with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Rewrite the timestamp field of `fields`; on error the mapping is left untouched
pub fn normalize(fields: &mut Fields) -> Result<(), TimestampError> {
    let value = match fields.get(TIMESTAMP_FIELD) {
        None => return Err(TimestampError::Missing),
        Some(FieldValue::String(s)) if s.trim().is_empty() => return Err(TimestampError::Empty),
        Some(FieldValue::String(s)) => s,
        Some(_) => return Err(TimestampError::NotAString),
    };

    let converted = convert(value)?;
    fields.insert(TIMESTAMP_FIELD.to_string(), FieldValue::String(converted));
    Ok(())
}
