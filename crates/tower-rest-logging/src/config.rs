use crate::sink::LogSink;
use crate::LoggingLayer;
use std::fmt;
use std::sync::Arc;

/// Rewrites a dump before it is written, e.g. to mask credentials.
pub type Redactor = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Configuration for the logging layer.
#[derive(Clone)]
pub struct LoggingConfig {
    pub(crate) sink: Arc<dyn LogSink>,
    pub(crate) dump_request_body: bool,
    pub(crate) dump_response_body: bool,
    pub(crate) redactor: Option<Redactor>,
}

impl LoggingConfig {
    pub(crate) fn redact(&self, dump: String) -> String {
        match &self.redactor {
            Some(redactor) => redactor(&dump),
            None => dump,
        }
    }

    pub(crate) fn write(&self, entry: &str) {
        self.sink.write_entry(entry);
    }
}

impl fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("dump_request_body", &self.dump_request_body)
            .field("dump_response_body", &self.dump_response_body)
            .field("redactor", &self.redactor.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`LoggingConfig`].
pub struct LoggingConfigBuilder {
    sink: Arc<dyn LogSink>,
    dump_request_body: bool,
    dump_response_body: bool,
    redactor: Option<Redactor>,
}

impl LoggingConfigBuilder {
    /// Creates a builder writing to `sink`.
    ///
    /// Defaults:
    /// - both bodies dumped
    /// - no redaction
    pub fn new<S>(sink: S) -> Self
    where
        S: LogSink + 'static,
    {
        Self {
            sink: Arc::new(sink),
            dump_request_body: true,
            dump_response_body: true,
            redactor: None,
        }
    }

    /// Whether the request body is included in the dump.
    ///
    /// Dumping a streaming body buffers it in memory.
    pub fn dump_request_body(mut self, enabled: bool) -> Self {
        self.dump_request_body = enabled;
        self
    }

    /// Whether the response body is included in the dump.
    ///
    /// Dumping a streaming body buffers it in memory.
    pub fn dump_response_body(mut self, enabled: bool) -> Self {
        self.dump_response_body = enabled;
        self
    }

    /// Applies `redactor` to every dump before it reaches the sink.
    ///
    /// ```
    /// use tower_rest_logging::{LoggingLayer, MemorySink};
    ///
    /// let layer = LoggingLayer::builder(MemorySink::new())
    ///     .redactor(|dump| dump.replace("secret-token", "[REDACTED]"))
    ///     .build();
    /// # let _ = layer;
    /// ```
    pub fn redactor<F>(mut self, redactor: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.redactor = Some(Arc::new(redactor));
        self
    }

    pub fn build_config(self) -> LoggingConfig {
        LoggingConfig {
            sink: self.sink,
            dump_request_body: self.dump_request_body,
            dump_response_body: self.dump_response_body,
            redactor: self.redactor,
        }
    }

    /// Builds the logging layer.
    pub fn build(self) -> LoggingLayer {
        LoggingLayer::from_config(self.build_config())
    }
}
