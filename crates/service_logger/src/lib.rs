//! `service_logger` provides structured, leveled logging for services.
//!
//! It offers:
//! - A [`Logger`] handle that enriches every record with the service name, default fields and
//!   call-site [`Fields`], normalizes attached errors into an [`ErrorDescriptor`], and writes
//!   one record per call to a [`Sink`].
//! - Two interchangeable [`RecordSerializer`]s: a compact single-line JSON format for machine
//!   ingestion and a multi-line human-readable format for local development.
//! - A [`bridge`] which forwards records from third-party crates logging through the `log`
//!   facade or `tracing` into a [`Logger`].
//!
//! With the default `trace-context` feature, records emitted inside an active span carry the
//! `trace_id` and `span_id` of that span once tracing has been initialized with
//! [`trace_context::init_tracing`].
//!
//! # Example
//!
//! ```
//! use service_logger::{Fields, LoggerConfig, Logger};
//!
//! let logger = Logger::new(LoggerConfig::new("backend"))?;
//! logger.info(
//!     "Meeting created",
//!     Fields::new().with("tenantId", "t-123").with("meetingId", "m-456"),
//! );
//! # Ok::<(), service_logger::LoggerError>(())
//! ```

pub mod bridge;
mod fields;
mod formatter;
mod level;
mod logger;
mod normalize;
mod record;
mod sink;

pub use tracing_appender::non_blocking::WorkerGuard;

pub use self::{
    fields::{CapturedError, ExceptionLike, FieldValue, Fields, merge_fields},
    formatter::{CompactSerializer, LogFormat, PrettySerializer, RecordSerializer},
    level::{Level, should_emit},
    logger::{Logger, LoggerConfig, create_logger},
    normalize::{ErrorDescriptor, normalize_error},
    record::LogRecord,
    sink::Sink,
};

mod keys {
    use std::sync::LazyLock;

    use rustc_hash::FxHashSet;

    pub(crate) const LEVEL: &str = "level";
    pub(crate) const TIME: &str = "time";
    pub(crate) const MESSAGE: &str = "msg";
    pub(crate) const SERVICE: &str = "service";
    pub(crate) const ERROR: &str = "error";
    pub(crate) const LOGGER_NAME: &str = "logger_name";
    pub(crate) const MODULE: &str = "module";
    #[cfg(feature = "trace-context")]
    pub(crate) const TRACE_ID: &str = "trace_id";
    #[cfg(feature = "trace-context")]
    pub(crate) const SPAN_ID: &str = "span_id";

    /// Keys whose values are always generated by the logger.
    pub(crate) static RESERVED_KEYS: LazyLock<FxHashSet<&'static str>> =
        LazyLock::new(|| [LEVEL, TIME, MESSAGE].iter().copied().collect());
}

/// Errors that can occur within the logger.
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Represents an error in configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Represents an error during JSON serialization.
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    /// Represents an error while formatting a timestamp.
    #[error("Timestamp formatting error: {0}")]
    TimeFormatting(#[from] time::error::Format),

    /// Represents a failure to install a forwarder for an external logging source.
    #[error("Failed to install logging bridge: {0}")]
    BridgeInstallation(String),
}
