//! Collection of structured attributes from `tracing` events and `log` records.

use std::{error::Error, fmt, sync::Arc};

use serde_json::Value;
use tracing::field::{Field, Visit};

use crate::{CapturedError, FieldValue, Fields};

/// Name of the field `tracing` stores the formatted message in.
const MESSAGE_FIELD: &str = "message";

/// Captures the message and fields of a `tracing` event.
#[derive(Debug, Default)]
pub(super) struct EventFields {
    message: Option<String>,
    fields: Fields,
}

impl EventFields {
    pub(super) fn into_parts(self) -> (Option<String>, Fields) {
        (self.message, self.fields)
    }

    fn record_value(&mut self, name: &str, value: FieldValue) {
        match name {
            // Metadata of records converted from the `log` facade
            name if name.starts_with("log.") => (),
            name => {
                let name = name.strip_prefix("r#").unwrap_or(name);
                self.fields.insert(name, value);
            }
        }
    }

    fn record_json(&mut self, field: &Field, value: Value) {
        if field.name() == MESSAGE_FIELD {
            if self.message.is_none() {
                self.message = Some(match value {
                    Value::String(text) => text,
                    other => other.to_string(),
                });
            }
        } else {
            self.record_value(field.name(), FieldValue::Value(value));
        }
    }
}

impl Visit for EventFields {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record_json(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_json(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_json(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_json(field, Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == MESSAGE_FIELD {
            self.message = Some(value.to_owned());
        } else {
            self.record_value(field.name(), FieldValue::from(value));
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        let captured = CapturedError::with_type_name("Error", value);
        self.record_value(field.name(), FieldValue::Exception(Arc::new(captured)));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_json(field, Value::String(format!("{value:?}")));
    }
}

/// Captures the key-values of a `log` record.
#[derive(Debug, Default)]
pub(super) struct KeyValues {
    fields: Fields,
}

impl KeyValues {
    pub(super) fn into_fields(self) -> Fields {
        self.fields
    }
}

impl<'kvs> log::kv::VisitSource<'kvs> for KeyValues {
    fn visit_pair(
        &mut self,
        key: log::kv::Key<'kvs>,
        value: log::kv::Value<'kvs>,
    ) -> Result<(), log::kv::Error> {
        let value = serde_json::to_value(&value).unwrap_or_else(|_| Value::String(value.to_string()));
        self.fields.insert(key.as_str(), FieldValue::Value(value));
        Ok(())
    }
}
