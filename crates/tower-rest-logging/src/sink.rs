//! Destinations for log entries.
//!
//! Entries from concurrent calls may arrive in any order; every sink here
//! writes an entry atomically with respect to other entries.

use parking_lot::Mutex;
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use tracing::Level;

/// Receives complete log entries.
pub trait LogSink: Send + Sync {
    /// Writes one entry. Failures are the sink's concern and never reach
    /// the caller of the logged request.
    fn write_entry(&self, entry: &str);
}

impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn write_entry(&self, entry: &str) {
        self(entry)
    }
}

/// Writes entries to an [`io::Write`](std::io::Write) behind a mutex.
pub struct WriterSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> LogSink for WriterSink<W> {
    fn write_entry(&self, entry: &str) {
        let mut writer = self.writer.lock();
        if let Err(err) = writer
            .write_all(entry.as_bytes())
            .and_then(|()| writer.flush())
        {
            tracing::warn!(error = %err, "Failed to write log entry");
        }
    }
}

impl<W> fmt::Debug for WriterSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterSink").finish_non_exhaustive()
    }
}

/// Collects entries in memory. Clones share the same buffer.
#[derive(Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        self.buffer.lock().clone()
    }

    /// Empties the buffer and returns what it held.
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.buffer.lock())
    }
}

impl LogSink for MemorySink {
    fn write_entry(&self, entry: &str) {
        self.buffer.lock().push_str(entry);
    }
}

impl fmt::Debug for MemorySink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySink")
            .field("len", &self.buffer.lock().len())
            .finish()
    }
}

/// Emits each entry as a `tracing` event with target `tower_rest::http`.
#[derive(Debug, Clone, Copy)]
pub struct TracingSink {
    level: Level,
}

impl TracingSink {
    pub fn new(level: Level) -> Self {
        Self { level }
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl LogSink for TracingSink {
    fn write_entry(&self, entry: &str) {
        let entry = entry.trim_end();
        match self.level {
            Level::ERROR => tracing::error!(target: "tower_rest::http", "{entry}"),
            Level::WARN => tracing::warn!(target: "tower_rest::http", "{entry}"),
            Level::INFO => tracing::info!(target: "tower_rest::http", "{entry}"),
            Level::DEBUG => tracing::debug!(target: "tower_rest::http", "{entry}"),
            _ => tracing::trace!(target: "tower_rest::http", "{entry}"),
        }
    }
}
