//! `trace_context` provides read-only access to the ambient [OpenTelemetry](opentelemetry)
//! context, so that log lines can be correlated with distributed traces.
//!
//! It offers:
//! - [`current_trace_context`] to obtain the trace and span identifiers of the active span.
//! - [`get_baggage`] to look up a single baggage entry propagated with the active context.
//! - [`init_tracing`] to configure the OTLP span exporter and install instrumentation hooks
//!   once per process.
//!
//! The accessors never create or mutate spans. Every read is computed from the context of the
//! calling thread or task, so concurrent requests observe independent trace and baggage state.

mod baggage;
mod context;
mod init;

pub use self::{
    baggage::{BaggageEntry, baggage_entry, baggage_of, get_baggage},
    context::{TraceContext, current_trace_context, trace_context_of},
    init::{
        Instrumentation, SubscriberInstrumentation, TracingConfig, init_tracing,
        init_tracing_with, is_tracing_enabled, service_name, shutdown_tracing,
    },
};

/// Errors that can occur while initializing tracing.
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    /// Represents an error in configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Represents an exporter endpoint that is not a valid URL.
    #[error("Invalid exporter endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    /// Represents an error while building the OTLP span exporter.
    #[error("Failed to build OTLP span exporter: {0}")]
    ExporterBuild(#[from] opentelemetry_otlp::ExporterBuildError),

    /// Represents an error due to an invalid filtering directive.
    #[error("Failed to parse filtering directive: {0}")]
    InvalidFilteringDirective(#[from] tracing_subscriber::filter::ParseError),

    /// Represents a failure reported by an [`Instrumentation`] while installing its hooks.
    #[error("Failed to install `{name}` instrumentation: {reason}")]
    Instrumentation {
        /// Name of the instrumentation that failed.
        name: String,

        /// Description of the failure.
        reason: String,
    },

    /// Represents a failure while flushing and shutting down the tracer provider.
    #[error("Failed to shut down tracer provider: {0}")]
    Shutdown(#[from] opentelemetry_sdk::error::OTelSdkError),
}
