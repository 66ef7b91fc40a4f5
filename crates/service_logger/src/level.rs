//! Severity levels and their total order.

use std::{fmt, str::FromStr};

use super::LoggerError;

/// Severity of a log record.
///
/// [`Level::Verbose`] is an alias of [`Level::Debug`]: both have the same rank and are rendered
/// as `debug`. For this reason `Level` does not implement [`Ord`]; compare levels with
/// [`Level::rank`] or [`should_emit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Level {
    /// Diagnostic detail, usually disabled in production.
    Debug,

    /// Alias of [`Level::Debug`].
    Verbose,

    /// Routine operational events.
    Info,

    /// Unexpected conditions the service recovered from.
    Warn,

    /// Failed operations.
    Error,

    /// Failures after which the service cannot continue.
    Fatal,
}

impl Level {
    /// The position of this level in the total order `debug = verbose < info < warn < error <
    /// fatal`.
    pub const fn rank(self) -> u8 {
        match self {
            Self::Debug | Self::Verbose => 0,
            Self::Info => 1,
            Self::Warn => 2,
            Self::Error => 3,
            Self::Fatal => 4,
        }
    }

    /// The lowercase name used in compact output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug | Self::Verbose => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }

    /// The uppercase name used in human-readable output.
    pub const fn as_upper_str(self) -> &'static str {
        match self {
            Self::Debug | Self::Verbose => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }

    /// Maps a severity name used by an external logging source onto this scale.
    ///
    /// | external name(s)                                              | level   |
    /// |---------------------------------------------------------------|---------|
    /// | `trace`, `debug`, `verbose`, `fine`, `finer`                  | `debug` |
    /// | `info`, `notice`, `success`, `informational`                  | `info`  |
    /// | `warn`, `warning`                                             | `warn`  |
    /// | `error`, `err`                                                | `error` |
    /// | `critical`, `crit`, `fatal`, `alert`, `emergency`, `emerg`, `panic` | `fatal` |
    ///
    /// Matching is case-insensitive. Unknown names map to [`Level::Info`].
    pub fn from_external(severity: &str) -> Self {
        match severity.trim().to_ascii_lowercase().as_str() {
            "trace" | "debug" | "verbose" | "fine" | "finer" => Self::Debug,
            "warn" | "warning" => Self::Warn,
            "error" | "err" => Self::Error,
            "critical" | "crit" | "fatal" | "alert" | "emergency" | "emerg" | "panic" => {
                Self::Fatal
            }
            _ => Self::Info,
        }
    }
}

/// Returns `true` if a record at `level` passes a logger configured with `threshold`.
pub const fn should_emit(level: Level, threshold: Level) -> bool {
    level.rank() >= threshold.rank()
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "verbose" => Ok(Self::Verbose),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "fatal" => Ok(Self::Fatal),
            _ => Err(LoggerError::Configuration(format!(
                "unknown log level `{s}`, expected one of `debug`, `verbose`, `info`, `warn`, \
                 `error` or `fatal`"
            ))),
        }
    }
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::ERROR => Self::Error,
            tracing::Level::WARN => Self::Warn,
            tracing::Level::INFO => Self::Info,
            _ => Self::Debug,
        }
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Trace | log::Level::Debug => Self::Debug,
            log::Level::Info => Self::Info,
            log::Level::Warn => Self::Warn,
            log::Level::Error => Self::Error,
        }
    }
}
