use crate::sink::LogSink;
use crate::{Logging, LoggingConfig, LoggingConfigBuilder};
use std::sync::Arc;
use tower::Layer;

/// A Tower [`Layer`] that dumps requests and responses to a [`LogSink`].
#[derive(Clone, Debug)]
pub struct LoggingLayer {
    config: Arc<LoggingConfig>,
}

impl LoggingLayer {
    /// Logs full requests and responses, bodies included, to `sink`.
    pub fn new<S>(sink: S) -> Self
    where
        S: LogSink + 'static,
    {
        Self::builder(sink).build()
    }

    /// Creates a builder writing to `sink`.
    pub fn builder<S>(sink: S) -> LoggingConfigBuilder
    where
        S: LogSink + 'static,
    {
        LoggingConfigBuilder::new(sink)
    }

    pub fn from_config(config: LoggingConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = Logging<S>;

    fn layer(&self, service: S) -> Self::Service {
        Logging::new(service, Arc::clone(&self.config))
    }
}
