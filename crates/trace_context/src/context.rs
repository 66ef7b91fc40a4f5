//! Accessors for the trace and span identifiers of the active span.

use opentelemetry::{Context, trace::TraceContextExt};
use serde::Serialize;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Identifiers of the span active in the calling execution context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TraceContext {
    /// The trace identifier, as 32 lowercase hexadecimal characters.
    pub trace_id: String,

    /// The span identifier, as 16 lowercase hexadecimal characters.
    pub span_id: String,
}

/// Returns the identifiers of the span active in the calling thread or task.
///
/// The OpenTelemetry context attached to the current [`tracing::Span`] is consulted first, so
/// that spans created through `tracing-opentelemetry` are visible. Otherwise the context
/// attached via [`opentelemetry::Context::attach`] is used.
///
/// Returns `None` when no valid span is active, which is an expected case rather than an error.
///
/// # Example
///
/// ```
/// assert!(trace_context::current_trace_context().is_none());
/// ```
pub fn current_trace_context() -> Option<TraceContext> {
    let span_cx = tracing::Span::current().context();
    trace_context_of(&span_cx).or_else(|| trace_context_of(&Context::current()))
}

/// Returns the identifiers of the span carried by the specified context, if it is valid.
pub fn trace_context_of(cx: &Context) -> Option<TraceContext> {
    let span = cx.span();
    let span_context = span.span_context();

    span_context.is_valid().then(|| TraceContext {
        trace_id: span_context.trace_id().to_string(),
        span_id: span_context.span_id().to_string(),
    })
}
