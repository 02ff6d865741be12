use crate::{Retry, RetryConfig, RetryConfigBuilder};
use std::sync::Arc;
use std::time::Duration;
use tower::Layer;

/// A Tower [`Layer`] that retries failed exchanges.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tower::ServiceBuilder;
/// use tower_rest_core::{executor_fn, Body, Error, HttpRequest, HttpResponse};
/// use tower_rest_retry::RetryLayer;
///
/// let executor = ServiceBuilder::new()
///     .layer(RetryLayer::new(3, Duration::from_millis(200)))
///     .service(executor_fn(|_req: HttpRequest| async move {
///         Ok::<_, Error>(HttpResponse::new(Body::empty()))
///     }));
/// # let _ = executor;
/// ```
///
/// With jittered exponential backoff and a hook:
///
/// ```
/// use std::time::Duration;
/// use tower_rest_retry::{ExponentialRandomBackoff, RetryLayer};
///
/// let layer = RetryLayer::builder()
///     .name("catalog-api")
///     .max_attempts(5)
///     .backoff(ExponentialRandomBackoff::new(Duration::from_millis(100), 0.5))
///     .on_exhausted(|attempts| eprintln!("gave up after {attempts} attempts"))
///     .build();
/// # let _ = layer;
/// ```
#[derive(Clone, Debug)]
pub struct RetryLayer {
    config: Arc<RetryConfig>,
}

impl RetryLayer {
    /// Makes up to `max_attempts` attempts in total, waiting `delay` between
    /// them.
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self::builder()
            .max_attempts(max_attempts)
            .fixed_backoff(delay)
            .build()
    }

    /// Creates a layer from a finished configuration.
    pub fn from_config(config: RetryConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Creates a new builder for configuring a retry layer.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = Retry<S>;

    fn layer(&self, service: S) -> Self::Service {
        Retry::new(service, Arc::clone(&self.config))
    }
}
