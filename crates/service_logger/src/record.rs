//! The record handed to a [`RecordSerializer`](crate::RecordSerializer).

use time::OffsetDateTime;

use super::{
    fields::{FieldValue, Fields},
    keys,
    level::Level,
};

/// A single log record, created per logging call.
#[derive(Debug)]
pub struct LogRecord {
    /// Severity of the record.
    pub level: Level,

    /// Instant the record was created.
    pub time: OffsetDateTime,

    /// Free-form message.
    pub message: String,

    /// Identity of the emitting service.
    pub service: String,

    /// Merged and normalized fields, excluding `service`.
    pub fields: Fields,
}

impl LogRecord {
    /// Creates a record timestamped now from merged fields.
    ///
    /// The `service` field is taken out of `fields` to become [`LogRecord::service`].
    pub fn new(level: Level, message: impl Into<String>, mut fields: Fields) -> Self {
        let service = match fields.remove(keys::SERVICE) {
            Some(FieldValue::Value(serde_json::Value::String(service))) => service,
            Some(other) => other.to_text(),
            None => String::new(),
        };

        Self {
            level,
            time: OffsetDateTime::now_utc(),
            message: message.into(),
            service,
            fields,
        }
    }

    /// Milliseconds elapsed since the Unix epoch.
    pub fn timestamp_millis(&self) -> i64 {
        i64::try_from(self.time.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
    }
}
