//! Forwarding of records emitted by third-party crates into a [`Logger`].
//!
//! Sources are identified by their `log`/`tracing` target prefix, for example `hyper` or
//! `sqlx::query`. Registered sources are kept in a process-wide routing table shared by the two
//! halves of the bridge:
//! - the [`LogForwarder`], installed as the `log` facade logger by [`intercept`], and
//! - the [`InterceptLayer`], which should be added to the `tracing` subscriber.
//!
//! An event is routed to the source with the longest name matching its target, where a name
//! matches if it is equal to the target or is followed by `::` or `.` in the target. Events
//! without a matching source go to the root logger registered with [`intercept_root`], and are
//! dropped if there is none.
//!
//! Each record should reach the bridge through one half only. If the `log-always` feature of
//! `tracing` is enabled anywhere in the dependency graph, `tracing` events are also emitted as
//! `log` records, and an intercepted event is then forwarded by both the [`InterceptLayer`] and
//! the [`LogForwarder`]. In that case, add only one of the two halves.
//!
//! # Example
//!
//! ```
//! use service_logger::{Logger, LoggerConfig, bridge};
//!
//! let logger = Logger::new(LoggerConfig::new("backend"))?;
//! bridge::intercept(&logger, ["hyper", "reqwest"])?;
//!
//! log::warn!(target: "hyper::proto", "connection reset");
//! # Ok::<(), service_logger::LoggerError>(())
//! ```

use std::sync::{LazyLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rustc_hash::FxHashMap;

use super::{Fields, Level, Logger, LoggerError, keys};

mod layer;
mod log_forwarder;
mod visitor;

pub use self::{layer::InterceptLayer, log_forwarder::LogForwarder};

/// Target prefix of records emitted by this crate, which are never forwarded.
const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

static ROUTES: LazyLock<RwLock<Routes>> = LazyLock::new(RwLock::default);

#[derive(Debug, Default)]
struct Routes {
    sources: FxHashMap<String, Logger>,
    root: Option<Logger>,
}

impl Routes {
    fn route(&self, target: &str) -> Option<&Logger> {
        self.sources
            .iter()
            .filter(|(source, _)| matches_source(target, source))
            .max_by_key(|(source, _)| source.len())
            .map(|(_, logger)| logger)
            .or(self.root.as_ref())
    }
}

fn matches_source(target: &str, source: &str) -> bool {
    match target.strip_prefix(source) {
        Some(rest) => rest.is_empty() || rest.starts_with("::") || rest.starts_with('.'),
        None => false,
    }
}

fn is_own_target(target: &str) -> bool {
    matches_source(target, OWN_TARGET)
}

fn read_routes() -> RwLockReadGuard<'static, Routes> {
    ROUTES.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_routes() -> RwLockWriteGuard<'static, Routes> {
    ROUTES.write().unwrap_or_else(PoisonError::into_inner)
}

/// Returns the logger records with the specified target are forwarded to, if any.
fn route(target: &str) -> Option<Logger> {
    if is_own_target(target) {
        return None;
    }
    read_routes().route(target).cloned()
}

/// Returns `true` if a record with the specified target and level would be forwarded.
fn is_forwarded(target: &str, level: Level) -> bool {
    route(target).is_some_and(|logger| logger.is_enabled(level))
}

/// Forwards records from the named sources to `logger`, and installs the [`LogForwarder`] as the
/// `log` facade logger if it has not been installed yet.
///
/// Registering a source again replaces its logger, so every record is forwarded exactly once
/// regardless of how many times a source is intercepted. Empty names are ignored.
///
/// # Errors
///
/// Returns [`LoggerError::BridgeInstallation`] if another `log` facade logger was installed
/// before the first call. The sources are registered even then, so that events reaching the
/// [`InterceptLayer`] are still forwarded.
pub fn intercept<I, S>(logger: &Logger, sources: I) -> Result<(), LoggerError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    {
        let mut routes = write_routes();
        for source in sources {
            let source = source.into();
            if source.trim().is_empty() {
                continue;
            }
            routes.sources.insert(source, logger.clone());
        }
    }

    log_forwarder::install()
}

/// Forwards records which do not match any named source to `logger`.
///
/// # Errors
///
/// Returns [`LoggerError::BridgeInstallation`] under the same conditions as [`intercept`].
pub fn intercept_root(logger: &Logger) -> Result<(), LoggerError> {
    write_routes().root = Some(logger.clone());
    log_forwarder::install()
}

/// Stops forwarding records from the named source. Returns `true` if it was registered.
pub fn release(source: &str) -> bool {
    write_routes().sources.remove(source).is_some()
}

/// Removes all sources and the root logger.
///
/// The `log` facade logger stays installed, but no longer forwards any records.
pub fn reset() {
    let mut routes = write_routes();
    routes.sources.clear();
    routes.root = None;
}

/// Returns `true` if records with the specified target are forwarded to a logger.
pub fn is_intercepted(target: &str) -> bool {
    route(target).is_some()
}

/// Forwards a single record to the logger its target is routed to.
///
/// The record is enriched with the `logger_name` (the target) and, if known, `module` fields,
/// followed by `attributes`. Returns `true` if the record was handed to a logger which has
/// `level` enabled.
pub fn forward(
    target: &str,
    module: Option<&str>,
    level: Level,
    message: &str,
    attributes: Fields,
) -> bool {
    let Some(logger) = route(target) else {
        return false;
    };
    if !logger.is_enabled(level) {
        return false;
    }

    let mut fields = Fields::with_capacity(attributes.len() + 2);
    fields.insert(keys::LOGGER_NAME, target.into());
    if let Some(module) = module {
        fields.insert(keys::MODULE, module.into());
    }
    fields.extend(attributes);

    logger.log(level, message, fields);
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::LoggerConfig;

    fn logger(service: &str) -> Logger {
        Logger::new(LoggerConfig::new(service)).unwrap()
    }

    #[test]
    fn source_matches_on_separators_only() {
        assert!(matches_source("hyper", "hyper"));
        assert!(matches_source("hyper::client::pool", "hyper"));
        assert!(matches_source("uvicorn.access", "uvicorn"));
        assert!(!matches_source("hyperlocal", "hyper"));
        assert!(!matches_source("hyp", "hyper"));
    }

    #[test]
    fn longest_source_wins() {
        let mut routes = Routes::default();
        routes.sources.insert("hyper".to_owned(), logger("general"));
        routes
            .sources
            .insert("hyper::client".to_owned(), logger("client"));

        let service_of = |target| routes.route(target).map(Logger::service);
        assert_eq!(service_of("hyper::client::pool"), Some("client"));
        assert_eq!(service_of("hyper::server"), Some("general"));
        assert_eq!(service_of("h2"), None);
    }

    #[test]
    fn unmatched_targets_go_to_root() {
        let mut routes = Routes {
            root: Some(logger("root")),
            ..Routes::default()
        };
        routes.sources.insert("sqlx".to_owned(), logger("db"));

        assert_eq!(routes.route("sqlx::query").map(Logger::service), Some("db"));
        assert_eq!(routes.route("tower_http").map(Logger::service), Some("root"));
    }

    #[test]
    fn own_records_are_never_routed() {
        assert!(is_own_target("service_logger"));
        assert!(is_own_target("service_logger::formatter"));
        assert!(!is_own_target("service_logger_ext"));
        assert!(route("service_logger::formatter").is_none());
    }
}
