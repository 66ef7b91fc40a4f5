use std::sync::OnceLock;

use super::visitor::KeyValues;

static INSTALLATION: OnceLock<Result<(), String>> = OnceLock::new();

/// A `log` facade logger forwarding records of intercepted sources.
///
/// Installed by [`intercept`](super::intercept) and [`intercept_root`](super::intercept_root).
/// Key-values attached to a record are forwarded as fields.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogForwarder;

impl log::Log for LogForwarder {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        super::is_forwarded(metadata.target(), metadata.level().into())
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let mut key_values = KeyValues::default();
        let _ = record.key_values().visit(&mut key_values);

        super::forward(
            record.target(),
            record.module_path(),
            record.level().into(),
            &record.args().to_string(),
            key_values.into_fields(),
        );
    }

    fn flush(&self) {}
}

/// Installs the [`LogForwarder`] as the `log` facade logger, once per process.
pub(super) fn install() -> Result<(), crate::LoggerError> {
    INSTALLATION
        .get_or_init(|| {
            log::set_boxed_logger(Box::new(LogForwarder))
                .map(|()| log::set_max_level(log::LevelFilter::Trace))
                .map_err(|error| error.to_string())
        })
        .clone()
        .map_err(crate::LoggerError::BridgeInstallation)
}
