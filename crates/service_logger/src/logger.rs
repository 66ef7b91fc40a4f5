//! The [`Logger`] handle and its configuration.

use std::sync::Arc;

use serde::Deserialize;

use super::{
    LoggerError,
    fields::{Fields, merge_fields},
    formatter::{LogFormat, RecordSerializer},
    level::{Level, should_emit},
    normalize::normalize_error,
    record::LogRecord,
    sink::Sink,
};

/// Configuration options for a [`Logger`].
///
/// Can be deserialized as part of a service's own configuration:
///
/// ```
/// use service_logger::LoggerConfig;
///
/// let config: LoggerConfig =
///     serde_json::from_str(r#"{ "service": "backend", "level": "debug" }"#).unwrap();
/// assert_eq!(config.level, "debug");
/// assert!(!config.pretty);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggerConfig {
    /// Identity attached to every record. Must not be blank.
    pub service: String,

    /// Minimum level emitted: one of `debug`, `verbose`, `info`, `warn`, `error` or `fatal`.
    #[serde(default = "default_level")]
    pub level: String,

    /// If `true`, records are written in the human-readable format instead of compact JSON.
    #[serde(default)]
    pub pretty: bool,
}

fn default_level() -> String {
    Level::Info.as_str().to_owned()
}

impl LoggerConfig {
    /// Creates a configuration emitting compact JSON at `info` level and above.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            level: default_level(),
            pretty: false,
        }
    }

    /// Creates a configuration whose service identity is the service name tracing was
    /// initialized with, so that log records and exported spans carry the same name.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::Configuration`] if tracing has not been initialized.
    #[cfg(feature = "trace-context")]
    pub fn from_tracing() -> Result<Self, LoggerError> {
        trace_context::service_name()
            .map(Self::new)
            .ok_or_else(|| {
                LoggerError::Configuration(
                    "tracing must be initialized before deriving the service name from it"
                        .to_owned(),
                )
            })
    }

    /// Sets the minimum level emitted.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Selects the human-readable format.
    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

/// A structured logger bound to a service identity.
///
/// Cloning a logger is cheap; clones share the configuration and the sink.
#[derive(Clone, Debug)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

#[derive(Debug)]
struct LoggerInner {
    service: String,
    threshold: Level,
    format: LogFormat,
    serializer: Arc<dyn RecordSerializer>,
    default_fields: Fields,
    sink: Arc<Sink>,
}

impl Logger {
    /// Creates a logger writing to standard error.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::Configuration`] if the service name is blank or the level is
    /// unknown.
    pub fn new(config: LoggerConfig) -> Result<Self, LoggerError> {
        Self::with_sink(config, Sink::stderr())
    }

    /// Creates a logger writing to the specified sink.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::Configuration`] if the service name is blank or the level is
    /// unknown.
    pub fn with_sink(config: LoggerConfig, sink: Sink) -> Result<Self, LoggerError> {
        let service = config.service.trim();
        if service.is_empty() {
            return Err(LoggerError::Configuration(
                "a service name is required".to_owned(),
            ));
        }

        let threshold = config.level.parse::<Level>()?;
        let format = LogFormat::from(config.pretty);

        Ok(Self {
            inner: Arc::new(LoggerInner {
                service: service.to_owned(),
                threshold,
                format,
                serializer: Arc::from(format.serializer()),
                default_fields: Fields::new(),
                sink: Arc::new(sink),
            }),
        })
    }

    /// Returns a logger sharing this logger's configuration and sink, which adds `fields` to
    /// every record. Call-site fields still take precedence.
    #[must_use]
    pub fn with_fields(&self, fields: impl Into<Fields>) -> Self {
        let mut default_fields = self.inner.default_fields.clone();
        default_fields.extend(fields.into());

        Self {
            inner: Arc::new(LoggerInner {
                service: self.inner.service.clone(),
                threshold: self.inner.threshold,
                format: self.inner.format,
                serializer: Arc::clone(&self.inner.serializer),
                default_fields,
                sink: Arc::clone(&self.inner.sink),
            }),
        }
    }

    /// The configured service identity.
    pub fn service(&self) -> &str {
        &self.inner.service
    }

    /// The minimum level emitted.
    pub fn level(&self) -> Level {
        self.inner.threshold
    }

    /// The configured output format.
    pub fn format(&self) -> LogFormat {
        self.inner.format
    }

    /// Returns `true` if records at `level` would be written.
    pub fn is_enabled(&self, level: Level) -> bool {
        should_emit(level, self.inner.threshold)
    }

    /// Logs a record at `level`.
    ///
    /// Records below the configured level are discarded before any field processing.
    /// Failures to serialize or write the record are ignored.
    pub fn log(&self, level: Level, message: &str, fields: impl Into<Fields>) {
        if !self.is_enabled(level) {
            return;
        }

        let fields = merge_fields(
            &self.inner.service,
            &self.inner.default_fields,
            fields.into(),
        );
        #[allow(unused_mut)]
        let mut fields = normalize_error(fields);

        #[cfg(feature = "trace-context")]
        inject_trace_context(&mut fields);

        let record = LogRecord::new(level, message, fields);
        if let Ok(serialized) = self.inner.serializer.serialize(&record) {
            let _ = self.inner.sink.write_record(serialized);
        }
    }

    /// Logs a record at [`Level::Debug`].
    pub fn debug(&self, message: &str, fields: impl Into<Fields>) {
        self.log(Level::Debug, message, fields);
    }

    /// Logs a record at [`Level::Verbose`], an alias of [`Level::Debug`].
    pub fn verbose(&self, message: &str, fields: impl Into<Fields>) {
        self.log(Level::Verbose, message, fields);
    }

    /// Logs a record at [`Level::Info`].
    pub fn info(&self, message: &str, fields: impl Into<Fields>) {
        self.log(Level::Info, message, fields);
    }

    /// Logs a record at [`Level::Warn`].
    pub fn warn(&self, message: &str, fields: impl Into<Fields>) {
        self.log(Level::Warn, message, fields);
    }

    /// Logs a record at [`Level::Error`].
    pub fn error(&self, message: &str, fields: impl Into<Fields>) {
        self.log(Level::Error, message, fields);
    }

    /// Logs a record at [`Level::Fatal`].
    pub fn fatal(&self, message: &str, fields: impl Into<Fields>) {
        self.log(Level::Fatal, message, fields);
    }
}

/// Adds the identifiers of the active span, unless the caller supplied them.
#[cfg(feature = "trace-context")]
fn inject_trace_context(fields: &mut Fields) {
    use super::keys;

    if !trace_context::is_tracing_enabled() {
        return;
    }

    if let Some(trace_context) = trace_context::current_trace_context() {
        fields.insert_if_absent(keys::TRACE_ID, trace_context.trace_id.into());
        fields.insert_if_absent(keys::SPAN_ID, trace_context.span_id.into());
    }
}

/// Creates a logger for `service` writing to standard error.
///
/// # Errors
///
/// Returns [`LoggerError::Configuration`] if the service name is blank or the level is
/// unknown.
///
/// # Example
///
/// ```
/// let logger = service_logger::create_logger("backend", "info", false)?;
/// logger.debug("Not written", service_logger::Fields::new());
/// # Ok::<(), service_logger::LoggerError>(())
/// ```
pub fn create_logger(service: &str, level: &str, pretty: bool) -> Result<Logger, LoggerError> {
    Logger::new(
        LoggerConfig::new(service)
            .with_level(level)
            .with_pretty(pretty),
    )
}
