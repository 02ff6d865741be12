use crate::backoff::{ExponentialBackoff, FixedInterval, IntervalFunction};
use crate::events::{RetryEvent, RetryOutcome};
use crate::RetryLayer;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tower_rest_core::events::EventHooks;

/// Default wait between attempts.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(100);

/// Default total number of attempts.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Configuration for the retry layer.
pub struct RetryConfig {
    pub(crate) max_attempts: usize,
    pub(crate) interval: Arc<dyn IntervalFunction>,
    pub(crate) event_hooks: EventHooks<RetryEvent>,
    pub(crate) name: String,
}

impl RetryConfig {
    /// Creates a builder with default settings.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Total number of attempts, including the first.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// The wait after the zero-based `attempt` fails.
    pub fn next_interval(&self, attempt: usize) -> Duration {
        self.interval.next_interval(attempt)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_attempts", &self.max_attempts)
            .field("name", &self.name)
            .field("hooks", &self.event_hooks.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder {
    max_attempts: usize,
    interval: Option<Arc<dyn IntervalFunction>>,
    event_hooks: EventHooks<RetryEvent>,
    name: String,
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryConfigBuilder {
    /// Creates a new builder.
    ///
    /// Defaults:
    /// - max_attempts: 3
    /// - backoff: fixed 100ms
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: None,
            event_hooks: EventHooks::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the total number of attempts, including the first.
    ///
    /// `1` disables retrying. `0` is treated as `1`.
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Waits `delay` between attempts.
    pub fn fixed_backoff(mut self, delay: Duration) -> Self {
        self.interval = Some(Arc::new(FixedInterval::new(delay)));
        self
    }

    /// Doubles the wait after every failed attempt, starting at `initial`.
    pub fn exponential_backoff(mut self, initial: Duration) -> Self {
        self.interval = Some(Arc::new(ExponentialBackoff::new(initial)));
        self
    }

    /// Uses a custom interval function.
    pub fn backoff<I>(mut self, interval: I) -> Self
    where
        I: IntervalFunction + 'static,
    {
        self.interval = Some(Arc::new(interval));
        self
    }

    /// Names this instance in events, logs and metrics.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Called with every [`RetryEvent`], including the request it concerns.
    ///
    /// ```
    /// use tower_rest_retry::RetryLayer;
    /// use tower_rest_core::PipelineEvent;
    ///
    /// let layer = RetryLayer::builder()
    ///     .name("billing")
    ///     .on_event(|event| {
    ///         let (name, target) = (event.layer_name(), event.target());
    ///         println!("{name} {target}: {} after {:?}", event.kind(), event.elapsed());
    ///     })
    ///     .build();
    /// # let _ = layer;
    /// ```
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&RetryEvent) + Send + Sync + 'static,
    {
        self.event_hooks.add(f);
        self
    }

    /// Called before waiting for the next attempt.
    ///
    /// Receives the one-based number of the attempt that failed and the wait
    /// that follows it.
    ///
    /// ```
    /// use std::time::Duration;
    /// use tower_rest_retry::RetryLayer;
    ///
    /// let layer = RetryLayer::builder()
    ///     .max_attempts(4)
    ///     .on_retry(|attempt, delay| {
    ///         println!("attempt {attempt} failed, retrying in {delay:?}");
    ///     })
    ///     .build();
    /// # let _ = layer;
    /// ```
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_hooks.add(move |event: &RetryEvent| {
            if let RetryOutcome::Retry { attempt, delay } = event.outcome {
                f(attempt, delay);
            }
        });
        self
    }

    /// Called when an attempt produces a final response, with the number of
    /// attempts made.
    ///
    /// Any status that is not retried counts, including 4xx responses.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_hooks.add(move |event: &RetryEvent| {
            if let RetryOutcome::Success { attempts } = event.outcome {
                f(attempts);
            }
        });
        self
    }

    /// Called when every attempt failed, with the number of attempts made.
    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_hooks.add(move |event: &RetryEvent| {
            if let RetryOutcome::Exhausted { attempts } = event.outcome {
                f(attempts);
            }
        });
        self
    }

    /// Called when the cancellation token stops the call, with the one-based
    /// number of the attempt that was not made.
    pub fn on_cancelled<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_hooks.add(move |event: &RetryEvent| {
            if let RetryOutcome::Cancelled { attempt } = event.outcome {
                f(attempt);
            }
        });
        self
    }

    /// Builds the configuration.
    pub fn build_config(self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts.max(1),
            interval: self
                .interval
                .unwrap_or_else(|| Arc::new(FixedInterval::new(DEFAULT_DELAY))),
            event_hooks: self.event_hooks,
            name: self.name,
        }
    }

    /// Builds the retry layer.
    pub fn build(self) -> RetryLayer {
        RetryLayer::from_config(self.build_config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RetryConfigBuilder::new().build_config();
        assert_eq!(config.max_attempts(), 3);
        assert_eq!(config.next_interval(0), DEFAULT_DELAY);
        assert_eq!(config.next_interval(5), DEFAULT_DELAY);
        assert_eq!(config.name(), "<unnamed>");
    }

    #[test]
    fn zero_attempts_clamped() {
        let config = RetryConfig::builder().max_attempts(0).build_config();
        assert_eq!(config.max_attempts(), 1);
    }

    #[test]
    fn exponential_backoff_is_used() {
        let config = RetryConfig::builder()
            .exponential_backoff(Duration::from_millis(50))
            .build_config();
        assert_eq!(config.next_interval(0), Duration::from_millis(50));
        assert_eq!(config.next_interval(2), Duration::from_millis(200));
    }

    #[test]
    fn every_hook_is_registered() {
        let config = RetryConfig::builder()
            .on_event(|_| {})
            .on_retry(|_, _| {})
            .on_success(|_| {})
            .on_exhausted(|_| {})
            .on_cancelled(|_| {})
            .build_config();
        assert_eq!(config.event_hooks.len(), 5);
    }
}
