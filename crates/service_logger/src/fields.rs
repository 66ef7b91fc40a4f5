//! Record fields, and the merging of service identity, default fields and call-site fields.

use std::{
    backtrace::{Backtrace, BacktraceStatus},
    error::Error,
    fmt::{self, Write as _},
    sync::Arc,
};

use serde::{Serialize, Serializer};
use serde_json::Value;

use super::{keys, normalize::ErrorDescriptor};

/// A value which can be reported as an exception: it has a type name, a message and,
/// if it was captured with one, a stack trace.
///
/// Only values providing a stack trace are normalized into an [`ErrorDescriptor`].
pub trait ExceptionLike: fmt::Debug + Send + Sync {
    /// The name of the concrete type of the exception.
    fn type_name(&self) -> &str;

    /// The textual description of the exception.
    fn message(&self) -> String;

    /// The formatted trace from the point of capture, if available.
    fn stack_trace(&self) -> Option<String>;
}

/// An [`Error`] captured together with its cause chain and a backtrace.
///
/// The stack text starts with `<Type>: <message>`, followed by a `Caused by:` block listing
/// [`Error::source`]s and the backtrace of the point where the error was captured.
#[derive(Clone, Debug)]
pub struct CapturedError {
    type_name: String,
    message: String,
    stack: String,
}

impl CapturedError {
    /// Captures `error`, using the unqualified name of `E` as the type name.
    pub fn new<E>(error: &E) -> Self
    where
        E: Error + 'static,
    {
        Self::with_type_name(short_type_name(std::any::type_name::<E>()), error)
    }

    /// Captures `error` with an explicit type name, for example for boxed trait objects whose
    /// concrete type is not known statically.
    pub fn with_type_name(type_name: impl Into<String>, error: &(dyn Error + 'static)) -> Self {
        let type_name = type_name.into();
        let message = error.to_string();

        let mut stack = format!("{type_name}: {message}\n");

        let mut source = error.source();
        if source.is_some() {
            stack.push_str("\nCaused by:\n");
        }
        let mut index = 0_usize;
        while let Some(cause) = source {
            let _ = writeln!(stack, "    {index}: {cause}");
            index += 1;
            source = cause.source();
        }

        let backtrace = Backtrace::force_capture();
        if backtrace.status() == BacktraceStatus::Captured {
            let _ = write!(stack, "\nStack backtrace:\n{backtrace}");
        }

        Self {
            type_name,
            message,
            stack,
        }
    }
}

impl ExceptionLike for CapturedError {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn message(&self) -> String {
        self.message.clone()
    }

    fn stack_trace(&self) -> Option<String> {
        Some(self.stack.clone())
    }
}

/// Strips the module path and generic parameters from a type name.
fn short_type_name(full_name: &str) -> &str {
    let without_generics = full_name.split('<').next().unwrap_or(full_name);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}

/// The value of a single record field.
#[derive(Clone, Debug)]
pub enum FieldValue {
    /// An arbitrary JSON value.
    Value(Value),

    /// An exception which has not been normalized yet.
    Exception(Arc<dyn ExceptionLike>),

    /// A normalized exception.
    Error(ErrorDescriptor),
}

impl FieldValue {
    /// Renders the value as text: strings as-is, other JSON values as compact JSON, and
    /// exceptions as their message.
    pub fn to_text(&self) -> String {
        match self {
            Self::Value(Value::String(text)) => text.clone(),
            Self::Value(value) => value.to_string(),
            Self::Exception(exception) => exception.message(),
            Self::Error(descriptor) => descriptor.message.clone(),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(value) => value.serialize(serializer),
            Self::Exception(exception) => serializer.serialize_str(&exception.message()),
            Self::Error(descriptor) => descriptor.serialize(serializer),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Value(Value::String(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Value(Value::String(value.to_owned()))
    }
}

impl From<ErrorDescriptor> for FieldValue {
    fn from(descriptor: ErrorDescriptor) -> Self {
        Self::Error(descriptor)
    }
}

impl From<Arc<dyn ExceptionLike>> for FieldValue {
    fn from(exception: Arc<dyn ExceptionLike>) -> Self {
        Self::Exception(exception)
    }
}

/// An ordered collection of record fields.
///
/// Inserting a key which is already present replaces its value in place, so that the last
/// write wins while the key keeps its first position.
///
/// # Example
///
/// ```
/// use service_logger::Fields;
///
/// let fields = Fields::new()
///     .with("tenantId", "t-123")
///     .with("attempt", 1)
///     .with("tenantId", "t-456");
///
/// let keys: Vec<_> = fields.iter().map(|(key, _)| key).collect();
/// assert_eq!(keys, ["tenantId", "attempt"]);
/// assert_eq!(fields.get("tenantId").map(|value| value.to_text()).as_deref(), Some("t-456"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Fields {
    entries: Vec<(String, FieldValue)>,
}

impl Fields {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty collection with space for `capacity` fields.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Adds a JSON value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, FieldValue::Value(value.into()));
        self
    }

    /// Adds the [`Display`](fmt::Display) text of a value.
    #[must_use]
    pub fn with_display(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.insert(key, FieldValue::Value(Value::String(value.to_string())));
        self
    }

    /// Adds a serializable value, falling back to its [`Debug`](fmt::Debug) text if it cannot
    /// be represented as JSON.
    #[must_use]
    pub fn with_serialized<V>(mut self, key: impl Into<String>, value: &V) -> Self
    where
        V: Serialize + fmt::Debug + ?Sized,
    {
        let value = serde_json::to_value(value)
            .unwrap_or_else(|_| Value::String(format!("{value:?}")));
        self.insert(key, FieldValue::Value(value));
        self
    }

    /// Captures `error` with its backtrace under the `error` key.
    #[must_use]
    pub fn with_error<E>(mut self, error: &E) -> Self
    where
        E: Error + 'static,
    {
        self.insert(keys::ERROR, FieldValue::Exception(Arc::new(CapturedError::new(error))));
        self
    }

    /// Adds an exception-like value.
    #[must_use]
    pub fn with_exception(mut self, key: impl Into<String>, exception: Arc<dyn ExceptionLike>) -> Self {
        self.insert(key, FieldValue::Exception(exception));
        self
    }

    /// Inserts a field, replacing the value of an existing field with the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Inserts a field only if no field with the same key exists.
    /// Returns `true` if the field was inserted.
    pub fn insert_if_absent(&mut self, key: impl Into<String>, value: FieldValue) -> bool {
        let key = key.into();
        if self.contains_key(&key) {
            false
        } else {
            self.entries.push((key, value));
            true
        }
    }

    /// Returns the value of the field with the specified key.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    /// Removes the field with the specified key and returns its value.
    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        let position = self.entries.iter().position(|(existing, _)| existing == key)?;
        Some(self.entries.remove(position).1)
    }

    /// Returns `true` if a field with the specified key exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(existing, _)| existing == key)
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no fields.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }
}

impl Extend<(String, FieldValue)> for Fields {
    fn extend<T: IntoIterator<Item = (String, FieldValue)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Fields
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut fields = Self::new();
        for (key, value) in iter {
            fields.insert(key, FieldValue::Value(value.into()));
        }
        fields
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Fields
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl IntoIterator for Fields {
    type Item = (String, FieldValue);
    type IntoIter = std::vec::IntoIter<(String, FieldValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Combines the service identity, default fields and call-site fields into one mapping.
///
/// `service` comes first, followed by the default fields and then the call-site fields.
/// Later duplicate keys overwrite earlier ones, so call-site values win.
pub fn merge_fields(service: &str, defaults: &Fields, call_site: Fields) -> Fields {
    let mut merged = Fields::with_capacity(1 + defaults.len() + call_site.len());
    merged.insert(keys::SERVICE, FieldValue::from(service));
    merged.extend(defaults.entries.iter().cloned());
    merged.extend(call_site);
    merged
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug)]
    struct ValueError(&'static str);

    impl fmt::Display for ValueError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl Error for ValueError {}

    #[derive(Debug)]
    struct WrappedError(ValueError);

    impl fmt::Display for WrappedError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("operation failed")
        }
    }

    impl Error for WrappedError {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    fn keys_of(fields: &Fields) -> Vec<&str> {
        fields.iter().map(|(key, _)| key).collect()
    }

    #[test]
    fn merge_puts_service_first_and_keeps_call_site_order() {
        let defaults = Fields::new().with("region", "eu");
        let call_site = Fields::new()
            .with("tenantId", "t-123")
            .with("meetingId", "m-456");

        let merged = merge_fields("backend", &defaults, call_site);

        assert_eq!(
            keys_of(&merged),
            ["service", "region", "tenantId", "meetingId"]
        );
        assert_eq!(merged.get("service").unwrap().to_text(), "backend");
    }

    #[test]
    fn call_site_values_win_over_defaults() {
        let defaults = Fields::new().with("region", "eu").with("version", "1.0");
        let call_site = Fields::new().with("region", "us");

        let merged = merge_fields("backend", &defaults, call_site);

        assert_eq!(keys_of(&merged), ["service", "region", "version"]);
        assert_eq!(merged.get("region").unwrap().to_text(), "us");
    }

    #[test]
    fn later_duplicates_overwrite_in_place() {
        let fields: Fields = [("a", json!(1)), ("b", json!(2)), ("a", json!(3))].into();

        assert_eq!(keys_of(&fields), ["a", "b"]);
        assert_eq!(fields.get("a").unwrap().to_text(), "3");
    }

    #[test]
    fn serialized_values_degrade_to_debug_text() {
        let mut map = std::collections::HashMap::new();
        map.insert((1, 2), "pair");

        let fields = Fields::new()
            .with_serialized("ok", &vec![1, 2])
            .with_serialized("degraded", &map);

        assert_eq!(fields.get("ok").unwrap().to_text(), "[1,2]");
        assert_eq!(
            fields.get("degraded").unwrap().to_text(),
            format!("{map:?}")
        );
    }

    #[test]
    fn captured_error_uses_short_type_name() {
        let error = "abc".parse::<i32>().unwrap_err();
        let captured = CapturedError::new(&error);

        assert_eq!(captured.type_name(), "ParseIntError");
        assert_eq!(captured.message(), error.to_string());
        assert!(captured
            .stack_trace()
            .unwrap()
            .starts_with("ParseIntError: invalid digit found in string"));
    }

    #[test]
    fn captured_error_includes_cause_chain() {
        let captured = CapturedError::new(&WrappedError(ValueError("Invalid input")));
        let stack = captured.stack_trace().unwrap();

        assert_eq!(captured.type_name(), "WrappedError");
        assert!(stack.starts_with("WrappedError: operation failed\n"));
        assert!(stack.contains("Caused by:\n    0: Invalid input\n"));
    }

    #[test]
    fn with_error_stores_exception_under_error_key() {
        let fields = Fields::new()
            .with_error(&ValueError("Invalid input"))
            .with("operation", "risky_operation");

        match fields.get("error") {
            Some(FieldValue::Exception(exception)) => {
                assert_eq!(exception.type_name(), "ValueError");
                assert_eq!(exception.message(), "Invalid input");
            }
            other => panic!("unexpected error field: {other:?}"),
        }
    }

    #[test]
    fn strips_paths_and_generics_from_type_names() {
        assert_eq!(short_type_name("core::num::error::ParseIntError"), "ParseIntError");
        assert_eq!(short_type_name("my_crate::Wrapper<alloc::string::String>"), "Wrapper");
        assert_eq!(short_type_name("Plain"), "Plain");
    }

    #[test]
    fn insert_if_absent_keeps_existing_value() {
        let mut fields = Fields::new().with("trace_id", "caller");

        assert!(!fields.insert_if_absent("trace_id", FieldValue::from("injected")));
        assert!(fields.insert_if_absent("span_id", FieldValue::from("injected")));
        assert_eq!(fields.get("trace_id").unwrap().to_text(), "caller");
        assert_eq!(fields.len(), 2);
    }
}
