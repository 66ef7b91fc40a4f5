//! Serialization of a [`LogRecord`] into compact JSON or human-readable text.

use std::fmt;

use serde::ser::{SerializeMap, Serializer};
use time::{UtcOffset, format_description::BorrowedFormatItem, macros::format_description};

use super::{
    LoggerError,
    fields::FieldValue,
    keys,
    record::LogRecord,
};

const PRETTY_TIMESTAMP: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Renders a [`LogRecord`] as bytes, without a trailing newline.
pub trait RecordSerializer: fmt::Debug + Send + Sync {
    /// Serializes the record.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError`] if the record could not be rendered.
    fn serialize(&self, record: &LogRecord) -> Result<Vec<u8>, LoggerError>;
}

/// Output format of a [`Logger`](crate::Logger).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Single-line JSON, see [`CompactSerializer`].
    Compact,

    /// Multi-line human-readable text, see [`PrettySerializer`].
    Pretty,
}

impl LogFormat {
    /// Returns the serializer implementing this format.
    pub fn serializer(self) -> Box<dyn RecordSerializer> {
        match self {
            Self::Compact => Box::new(CompactSerializer),
            Self::Pretty => Box::new(PrettySerializer::new()),
        }
    }
}

impl From<bool> for LogFormat {
    fn from(pretty: bool) -> Self {
        if pretty { Self::Pretty } else { Self::Compact }
    }
}

/// Iterates over the fields that are not reserved for system-generated values.
fn additional_fields(record: &LogRecord) -> impl Iterator<Item = (&str, &FieldValue)> {
    record.fields.iter().filter(|(key, value)| {
        let reserved = keys::RESERVED_KEYS.contains(*key);
        if reserved {
            tracing::warn!(
                "Attempting to log a reserved key `{key}` (value: `{}`). Skipping.",
                value.to_text()
            );
        }
        !reserved
    })
}

/// Serializes a record as a single-line JSON object.
///
/// Keys are emitted in the fixed order `level`, `time`, `msg`, `service`, followed by the
/// remaining fields in merged order:
///
/// ```text
/// {"level":"info","time":1700000000000,"msg":"Meeting created","service":"backend","tenantId":"t-123"}
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct CompactSerializer;

impl RecordSerializer for CompactSerializer {
    fn serialize(&self, record: &LogRecord) -> Result<Vec<u8>, LoggerError> {
        let mut buffer = Vec::new();
        let mut serializer = serde_json::Serializer::new(&mut buffer);
        let mut map_serializer = serializer.serialize_map(None)?;

        map_serializer.serialize_entry(keys::LEVEL, record.level.as_str())?;
        map_serializer.serialize_entry(keys::TIME, &record.timestamp_millis())?;
        map_serializer.serialize_entry(keys::MESSAGE, &record.message)?;
        map_serializer.serialize_entry(keys::SERVICE, &record.service)?;

        for (key, value) in additional_fields(record) {
            map_serializer.serialize_entry(key, value)?;
        }

        map_serializer.end()?;
        Ok(buffer)
    }
}

/// Serializes a record as a header line followed by one indented line per field.
///
/// ```text
/// [2024-01-15 10:30:00] INFO: Meeting created
///     tenantId: t-123
///     error.type: ValueError
///     error.message: Invalid input
///     error.stack:
///         ValueError: Invalid input
/// ```
#[derive(Clone, Copy, Debug)]
pub struct PrettySerializer {
    offset: UtcOffset,
}

impl PrettySerializer {
    /// Creates a serializer rendering timestamps in the local time zone.
    ///
    /// The local offset is resolved once; UTC is used if it cannot be determined.
    pub fn new() -> Self {
        Self::with_offset(UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC))
    }

    /// Creates a serializer rendering timestamps with the specified offset.
    pub fn with_offset(offset: UtcOffset) -> Self {
        Self { offset }
    }
}

impl Default for PrettySerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordSerializer for PrettySerializer {
    fn serialize(&self, record: &LogRecord) -> Result<Vec<u8>, LoggerError> {
        let timestamp = record.time.to_offset(self.offset).format(PRETTY_TIMESTAMP)?;

        let mut lines = vec![format!(
            "[{timestamp}] {}: {}",
            record.level.as_upper_str(),
            record.message
        )];

        for (key, value) in additional_fields(record) {
            match value {
                FieldValue::Error(descriptor) => {
                    lines.push(format!("    {key}.type: {}", descriptor.type_name));
                    lines.push(format!("    {key}.message: {}", descriptor.message));
                    let stack = descriptor.stack.trim();
                    if !stack.is_empty() {
                        lines.push(format!("    {key}.stack:"));
                        lines.extend(stack.lines().map(|line| format!("        {line}")));
                    }
                }
                other => lines.push(format!("    {key}: {}", other.to_text())),
            }
        }

        Ok(lines.join("\n").into_bytes())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::{Value, json};
    use time::macros::datetime;

    use super::*;
    use crate::{ErrorDescriptor, Fields, Level, merge_fields};

    fn record(level: Level, message: &str, fields: Fields) -> LogRecord {
        let mut record = LogRecord::new(
            level,
            message,
            merge_fields("backend", &Fields::new(), fields),
        );
        record.time = datetime!(2024-01-15 10:30:00 UTC);
        record
    }

    fn descriptor() -> ErrorDescriptor {
        ErrorDescriptor {
            type_name: "ValueError".to_owned(),
            message: "Invalid input".to_owned(),
            stack: "ValueError: Invalid input\n    at risky_operation\n".to_owned(),
        }
    }

    fn compact(record: &LogRecord) -> String {
        String::from_utf8(CompactSerializer.serialize(record).unwrap()).unwrap()
    }

    fn pretty(record: &LogRecord) -> String {
        let serializer = PrettySerializer::with_offset(UtcOffset::UTC);
        String::from_utf8(serializer.serialize(record).unwrap()).unwrap()
    }

    #[test]
    fn compact_uses_fixed_leading_keys() {
        let record = record(
            Level::Info,
            "Meeting created",
            Fields::new()
                .with("tenantId", "t-123")
                .with("meetingId", "m-456"),
        );

        assert_eq!(
            compact(&record),
            r#"{"level":"info","time":1705314600000,"msg":"Meeting created","service":"backend","tenantId":"t-123","meetingId":"m-456"}"#
        );
    }

    #[test]
    fn compact_nests_error_descriptor() {
        let mut record = record(Level::Error, "Operation failed", Fields::new());
        record.fields.insert("error", descriptor().into());

        let value: Value = serde_json::from_str(&compact(&record)).unwrap();
        assert_eq!(
            value["error"],
            json!({
                "type": "ValueError",
                "message": "Invalid input",
                "stack": "ValueError: Invalid input\n    at risky_operation\n",
            })
        );
    }

    #[test]
    fn system_values_win_over_reserved_keys() {
        let record = record(
            Level::Warn,
            "real message",
            Fields::new()
                .with("level", "fake")
                .with("msg", "fake")
                .with("time", 0)
                .with("kept", true),
        );

        assert_eq!(
            compact(&record),
            r#"{"level":"warn","time":1705314600000,"msg":"real message","service":"backend","kept":true}"#
        );

        let output = pretty(&record);
        assert_eq!(
            output,
            "[2024-01-15 10:30:00] WARN: real message\n    kept: true"
        );
    }

    #[test]
    fn compact_does_not_escape_non_ascii() {
        let record = record(Level::Info, "Réunion créée", Fields::new().with("city", "Zürich"));
        let output = compact(&record);

        assert!(output.contains("Réunion créée"));
        assert!(output.contains("Zürich"));
        assert!(!output.contains('\n'));
        assert_eq!(output.trim_end(), output);
    }

    #[test]
    fn pretty_header_and_fields() {
        let record = record(
            Level::Info,
            "Meeting created",
            Fields::new()
                .with("tenantId", "t-123")
                .with("meetingId", "m-456"),
        );

        assert_eq!(
            pretty(&record),
            "[2024-01-15 10:30:00] INFO: Meeting created\n    tenantId: t-123\n    meetingId: m-456"
        );
    }

    #[test]
    fn pretty_renders_non_string_values_as_json() {
        let record = record(
            Level::Debug,
            "values",
            Fields::new()
                .with("count", 3)
                .with("tags", json!(["a", "b"])),
        );

        assert_eq!(
            pretty(&record),
            "[2024-01-15 10:30:00] DEBUG: values\n    count: 3\n    tags: [\"a\",\"b\"]"
        );
    }

    #[test]
    fn pretty_expands_error_descriptor() {
        let mut record = record(Level::Fatal, "Operation failed", Fields::new());
        record.fields.insert("error", descriptor().into());

        assert_eq!(
            pretty(&record),
            "[2024-01-15 10:30:00] FATAL: Operation failed\n    error.type: ValueError\n    \
             error.message: Invalid input\n    error.stack:\n        ValueError: Invalid \
             input\n            at risky_operation"
        );
    }

    #[test]
    fn pretty_uses_configured_offset() {
        let record = record(Level::Info, "shifted", Fields::new());
        let serializer = PrettySerializer::with_offset(UtcOffset::from_hms(2, 0, 0).unwrap());
        let output = String::from_utf8(serializer.serialize(&record).unwrap()).unwrap();

        assert_eq!(output, "[2024-01-15 12:30:00] INFO: shifted");
    }

    #[test]
    fn formats_are_interchangeable() {
        let record = record(Level::Info, "same input", Fields::new().with("a", 1));

        for format in [LogFormat::Compact, LogFormat::Pretty] {
            let output = format.serializer().serialize(&record).unwrap();
            assert!(!output.is_empty());
        }
        assert_eq!(LogFormat::from(true), LogFormat::Pretty);
        assert_eq!(LogFormat::from(false), LogFormat::Compact);
    }
}
