//! Output destinations for serialized records.

use std::io::{self, Write};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::{MakeWriter, writer::BoxMakeWriter};

/// The destination a [`Logger`](crate::Logger) writes records to.
///
/// Any [`MakeWriter`] can be used as a sink. Each record is written with a single `write_all`
/// call, so concurrently emitted records are never interleaved within a line as long as the
/// writer itself does not split writes.
#[derive(Debug)]
pub struct Sink {
    writer: BoxMakeWriter,
}

impl Sink {
    /// Creates a sink from a [`MakeWriter`].
    pub fn new<W>(make_writer: W) -> Self
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        Self {
            writer: BoxMakeWriter::new(make_writer),
        }
    }

    /// Creates a sink writing to standard error.
    pub fn stderr() -> Self {
        Self::new(io::stderr)
    }

    /// Creates a sink writing to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout)
    }

    /// Creates a sink which hands records to a background thread writing to `writer`.
    ///
    /// Records are written as long as the returned [`WorkerGuard`] is in scope; dropping it
    /// flushes pending records.
    pub fn non_blocking<T>(writer: T) -> (Self, WorkerGuard)
    where
        T: Write + Send + 'static,
    {
        let (non_blocking, guard) = tracing_appender::non_blocking(writer);
        (Self::new(non_blocking), guard)
    }

    /// Writes a serialized record followed by a newline.
    ///
    /// Should be done by a single `write_all` call to avoid fragmentation of records written
    /// from multiple threads.
    pub(crate) fn write_record(&self, mut buffer: Vec<u8>) -> io::Result<()> {
        buffer.write_all(b"\n")?;
        self.writer.make_writer().write_all(&buffer)
    }
}

impl Default for Sink {
    fn default() -> Self {
        Self::stderr()
    }
}

/// An in-memory writer shared between a [`Sink`] and the test reading its output.
#[cfg(test)]
#[derive(Clone, Debug, Default)]
pub(crate) struct SharedBuffer(pub(crate) std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

#[cfg(test)]
impl SharedBuffer {
    /// Creates a sink writing into `buffer`.
    pub(crate) fn sink(buffer: &std::sync::Arc<std::sync::Mutex<Vec<u8>>>) -> Sink {
        let buffer = std::sync::Arc::clone(buffer);
        Sink::new(move || Self(std::sync::Arc::clone(&buffer)))
    }
}

#[cfg(test)]
impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
