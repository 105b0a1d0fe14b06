//! Caller-supplied log sinks.
//!
//! The client never installs a global subscriber. It builds a private
//! [`Dispatch`] with one formatting layer per sink and runs its own work
//! under it, so the caller's logging setup is left alone.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::Dispatch;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Layer, Registry};

type BoxedWriter = Box<dyn Write + Send>;

/// A log destination.
///
/// Whether the client closes the writer at [`Client::close`](crate::Client::close)
/// is fixed at construction: [`LogSink::new`] sinks are only flushed,
/// [`LogSink::owned`] sinks are flushed and then dropped.
#[derive(Debug, Clone)]
pub struct LogSink {
    writer: SharedWriter,
    close_on_shutdown: bool,
}

impl LogSink {
    /// Creates a sink the client flushes but does not close.
    #[must_use]
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: SharedWriter::new(Box::new(writer)),
            close_on_shutdown: false,
        }
    }

    /// Creates a sink the client closes when it shuts down.
    #[must_use]
    pub fn owned(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: SharedWriter::new(Box::new(writer)),
            close_on_shutdown: true,
        }
    }

    /// Returns true if the client closes this sink on shutdown.
    #[must_use]
    pub const fn closes_on_shutdown(&self) -> bool {
        self.close_on_shutdown
    }

    /// Returns true once the sink has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.writer.lock().is_none()
    }

    /// Flushes the sink, then closes it if it was created with [`LogSink::owned`].
    pub(crate) fn shutdown(&self) -> io::Result<()> {
        let mut guard = self.writer.lock();
        if let Some(writer) = guard.as_mut() {
            writer.flush()?;
        }
        if self.close_on_shutdown {
            *guard = None;
        }
        Ok(())
    }
}

/// A writer shared between the formatting layer and its [`LogSink`].
///
/// Writes after the sink is closed are discarded.
#[derive(Clone)]
struct SharedWriter {
    inner: Arc<Mutex<Option<BoxedWriter>>>,
}

impl SharedWriter {
    fn new(writer: BoxedWriter) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(writer))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<BoxedWriter>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SharedWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedWriter")
            .field("open", &self.lock().is_some())
            .finish()
    }
}

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.lock().as_mut() {
            Some(writer) => writer.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        // One lock per event keeps lines from concurrent sessions whole.
        match self.lock().as_mut() {
            Some(writer) => writer.write_all(buf),
            None => Ok(()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.lock().as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for SharedWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Builds the dispatch that writes to every sink at `level` and above.
///
/// With no sinks the dispatch drops everything.
pub(crate) fn dispatch(sinks: &[LogSink], level: LevelFilter) -> Dispatch {
    if sinks.is_empty() {
        return Dispatch::none();
    }

    let layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = sinks
        .iter()
        .map(|sink| {
            tracing_subscriber::fmt::layer()
                .with_writer(sink.writer.clone())
                .with_ansi(false)
                .with_filter(level)
                .boxed()
        })
        .collect();

    Dispatch::new(Registry::default().with(layers))
}
