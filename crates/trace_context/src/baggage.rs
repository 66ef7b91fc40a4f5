//! Single-key lookups of baggage propagated with the active context.

use opentelemetry::{Context, baggage::BaggageExt};
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// A baggage key and the value found for it in the active context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaggageEntry {
    /// The baggage key that was looked up.
    pub key: String,

    /// The value associated with the key.
    pub value: String,
}

/// Looks up the baggage value for `key` in the context of the calling thread or task.
///
/// Baggage carried by the OpenTelemetry context of the current [`tracing::Span`] takes
/// precedence over baggage attached via [`opentelemetry::Context::attach`].
/// Returns `None` if the key is not present.
///
/// # Example
///
/// ```
/// use opentelemetry::{Context, KeyValue, baggage::BaggageExt};
///
/// let _guard = Context::current_with_baggage([KeyValue::new("user_id", "u-42")]).attach();
///
/// assert_eq!(trace_context::get_baggage("user_id").as_deref(), Some("u-42"));
/// assert_eq!(trace_context::get_baggage("missing_key"), None);
/// ```
pub fn get_baggage(key: &str) -> Option<String> {
    let span_cx = tracing::Span::current().context();
    baggage_of(&span_cx, key).or_else(|| baggage_of(&Context::current(), key))
}

/// Looks up the baggage value for `key` in the specified context.
pub fn baggage_of(cx: &Context, key: &str) -> Option<String> {
    cx.baggage().get(key.to_owned()).map(ToString::to_string)
}

/// Same as [`get_baggage`], but returns the key alongside the value.
pub fn baggage_entry(key: &str) -> Option<BaggageEntry> {
    get_baggage(key).map(|value| BaggageEntry {
        key: key.to_owned(),
        value,
    })
}
