//! Retry middleware for tower-rest executors.
//!
//! [`RetryLayer`] wraps an executor and re-sends a request when the exchange
//! fails in a way that is likely to be transient:
//!
//! - a transport error from the inner executor
//! - a `5xx` response
//! - a `429 Too Many Requests` response carrying a parseable `Retry-After`
//!   header, in which case the server-provided wait is honoured
//!
//! Every other response, including a `429` without a usable `Retry-After`,
//! is returned to the caller as-is.
//!
//! The request body is read once before the first attempt and replayed from
//! memory for each attempt, so streaming bodies can be retried safely. If
//! reading it fails, no attempt is made.
//!
//! A [`CancellationToken`](tower_rest_core::CancellationToken) in the
//! request extensions is checked before every attempt and interrupts
//! backoff sleeps.
//!
//! When every attempt fails, the error reports the attempt count:
//! [`Error::RetriesExhausted`] wraps the last transport error, and
//! [`Error::StatusRetriesExhausted`] names the last retryable status.
//!
//! # Features
//!
//! - `tracing`: debug/warn diagnostics for retries and exhaustion
//! - `metrics`: `retry_calls_total{retry,result}`, `retry_attempts_total{retry}`,
//!   and the `retry_attempts{retry}` histogram
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use tower::{Layer, ServiceExt};
//! use tower_rest_core::{executor_fn, Body, Error, HttpRequest, HttpResponse};
//! use tower_rest_retry::RetryLayer;
//!
//! # async fn example() -> Result<(), Error> {
//! let layer = RetryLayer::builder()
//!     .max_attempts(3)
//!     .fixed_backoff(Duration::from_millis(50))
//!     .on_retry(|attempt, delay| println!("attempt {attempt} failed, waiting {delay:?}"))
//!     .build();
//!
//! let executor = layer.layer(executor_fn(|_req: HttpRequest| async move {
//!     Ok::<_, Error>(HttpResponse::new(Body::from("ok")))
//! }));
//! let resp = executor.oneshot(http::Request::new(Body::empty())).await?;
//! assert_eq!(resp.status(), 200);
//! # Ok(())
//! # }
//! ```

mod backoff;
mod config;
mod events;
mod layer;
mod retry_after;

pub use backoff::{
    ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, FnInterval, IntervalFunction,
};
pub use config::{RetryConfig, RetryConfigBuilder, DEFAULT_DELAY, DEFAULT_MAX_ATTEMPTS};
pub use events::{RetryEvent, RetryOutcome};
pub use layer::RetryLayer;
pub use retry_after::parse_retry_after;

use futures::future::BoxFuture;
use http::StatusCode;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tower::{Service, ServiceExt};
use tower_rest_core::events::RequestTarget;
use tower_rest_core::{drain_and_close, Error, HttpRequest, HttpResponse, ReplayableRequest};

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_histogram, histogram};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// A Tower [`Service`] that retries failed exchanges.
///
/// See the [crate documentation](crate) for the retry rules.
pub struct Retry<S> {
    inner: S,
    config: Arc<RetryConfig>,
}

impl<S> Retry<S> {
    /// Creates a new `Retry` service wrapping the given executor.
    pub fn new(inner: S, config: Arc<RetryConfig>) -> Self {
        #[cfg(feature = "metrics")]
        {
            describe_counter!(
                "retry_calls_total",
                "Total number of calls through the retry layer by result"
            );
            describe_counter!(
                "retry_attempts_total",
                "Total number of retries (attempts after the first)"
            );
            describe_histogram!("retry_attempts", "Number of attempts made per call");
        }

        Self { inner, config }
    }
}

impl<S> Clone for Retry<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for Retry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retry")
            .field("inner", &self.inner)
            .field("config", &self.config)
            .finish()
    }
}

/// How the previous attempt ended, for error reporting on exhaustion.
enum Failure {
    Transport(Error),
    Status(StatusCode),
}

/// What to do with a single attempt's outcome.
enum Verdict {
    Done(HttpResponse),
    Retry { failure: Failure, wait: Duration },
}

impl<S> Service<HttpRequest> for Retry<S>
where
    S: Service<HttpRequest, Response = HttpResponse, Error = Error> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = HttpResponse;
    type Error = Error;
    type Future = BoxFuture<'static, Result<HttpResponse, Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: HttpRequest) -> Self::Future {
        let mut service = self.inner.clone();
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let request = ReplayableRequest::capture(req).await?;
            let token = request.cancellation_token().cloned();
            let call = Call::new(&config, request.target());
            let max_attempts = config.max_attempts;
            let mut last_failure = None;

            for attempt in 0..max_attempts {
                if token.as_ref().is_some_and(CancellationToken::is_cancelled) {
                    return Err(cancelled(&call, attempt + 1));
                }

                let attempt_req = request.attempt();
                if attempt > 0 {
                    sleep(token.as_ref(), config.next_interval(attempt - 1)).await;
                    if token.as_ref().is_some_and(CancellationToken::is_cancelled) {
                        return Err(cancelled(&call, attempt + 1));
                    }
                }

                let outcome = match service.ready().await {
                    Ok(svc) => svc.call(attempt_req).await,
                    Err(err) => Err(err),
                };

                let (failure, wait) = match classify(outcome, &config, attempt).await {
                    Verdict::Done(resp) => {
                        success(&call, attempt + 1);
                        return Ok(resp);
                    }
                    Verdict::Retry { failure, wait } => (failure, wait),
                };

                if attempt + 1 < max_attempts {
                    let delay = wait.saturating_add(config.next_interval(attempt));
                    call.emit(RetryOutcome::Retry {
                        attempt: attempt + 1,
                        delay,
                    });

                    #[cfg(feature = "metrics")]
                    counter!("retry_attempts_total", "retry" => config.name.clone()).increment(1);

                    #[cfg(feature = "tracing")]
                    debug!(
                        retry = %config.name,
                        target = %call.target,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis(),
                        cause = %describe(&failure),
                        "Attempt failed, retrying"
                    );

                    sleep(token.as_ref(), wait).await;
                }
                last_failure = Some(failure);
            }

            Err(exhausted(&call, max_attempts, last_failure))
        })
    }
}

/// One call through the layer, as seen by event hooks.
struct Call<'a> {
    config: &'a RetryConfig,
    target: RequestTarget,
    started: Instant,
}

impl<'a> Call<'a> {
    fn new(config: &'a RetryConfig, target: RequestTarget) -> Self {
        Self {
            config,
            target,
            started: Instant::now(),
        }
    }

    fn emit(&self, outcome: RetryOutcome) {
        if self.config.event_hooks.is_empty() {
            return;
        }
        self.config.event_hooks.emit(&RetryEvent {
            layer_name: self.config.name.clone(),
            target: self.target.clone(),
            elapsed: self.started.elapsed(),
            outcome,
        });
    }
}

/// Sorts an attempt's outcome into a final response or a retryable failure.
///
/// Retryable responses are drained before being dropped. `wait` is slept
/// right after the attempt, ahead of the regular backoff that precedes the
/// next one.
async fn classify(
    outcome: Result<HttpResponse, Error>,
    config: &RetryConfig,
    attempt: usize,
) -> Verdict {
    let resp = match outcome {
        Ok(resp) => resp,
        Err(err) => {
            return Verdict::Retry {
                failure: Failure::Transport(err),
                wait: Duration::ZERO,
            }
        }
    };

    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        if let Some(wait) = retry_after::retry_after(resp.headers()) {
            drain_and_close(resp).await;
            return Verdict::Retry {
                failure: Failure::Status(status),
                wait,
            };
        }
        return Verdict::Done(resp);
    }

    if status.as_u16() >= 500 {
        drain_and_close(resp).await;
        return Verdict::Retry {
            failure: Failure::Status(status),
            wait: config.next_interval(attempt),
        };
    }

    Verdict::Done(resp)
}

/// Sleeps for `duration`, returning early if `token` fires.
async fn sleep(token: Option<&CancellationToken>, duration: Duration) {
    if duration.is_zero() {
        return;
    }
    match token {
        Some(token) => {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {}
                _ = token.cancelled() => {}
            }
        }
        None => tokio::time::sleep(duration).await,
    }
}

fn success(call: &Call<'_>, attempts: usize) {
    call.emit(RetryOutcome::Success { attempts });
    #[cfg(any(feature = "metrics", feature = "tracing"))]
    let config = call.config;

    #[cfg(feature = "metrics")]
    {
        counter!("retry_calls_total", "retry" => config.name.clone(), "result" => "success")
            .increment(1);
        histogram!("retry_attempts", "retry" => config.name.clone()).record(attempts as f64);
    }

    #[cfg(feature = "tracing")]
    debug!(retry = %config.name, attempts, "Call succeeded");
}

fn cancelled(call: &Call<'_>, attempt: usize) -> Error {
    call.emit(RetryOutcome::Cancelled { attempt });
    #[cfg(any(feature = "metrics", feature = "tracing"))]
    let config = call.config;

    #[cfg(feature = "metrics")]
    counter!("retry_calls_total", "retry" => config.name.clone(), "result" => "cancelled")
        .increment(1);

    #[cfg(feature = "tracing")]
    debug!(retry = %config.name, target = %call.target, attempt, "Call cancelled before attempt");

    Error::Cancelled
}

fn exhausted(call: &Call<'_>, attempts: usize, failure: Option<Failure>) -> Error {
    call.emit(RetryOutcome::Exhausted { attempts });
    #[cfg(any(feature = "metrics", feature = "tracing"))]
    let config = call.config;

    #[cfg(feature = "metrics")]
    {
        counter!("retry_calls_total", "retry" => config.name.clone(), "result" => "exhausted")
            .increment(1);
        histogram!("retry_attempts", "retry" => config.name.clone()).record(attempts as f64);
    }

    #[cfg(feature = "tracing")]
    warn!(
        retry = %config.name,
        target = %call.target,
        attempts,
        cause = %failure.as_ref().map(describe).unwrap_or_default(),
        "All retry attempts exhausted"
    );

    match failure {
        Some(Failure::Status(status)) => Error::StatusRetriesExhausted { attempts, status },
        Some(Failure::Transport(source)) => Error::RetriesExhausted {
            attempts,
            source: Box::new(source),
        },
        // The loop always runs at least once.
        None => Error::RetriesExhausted {
            attempts,
            source: Box::new(Error::Cancelled),
        },
    }
}

#[cfg(feature = "tracing")]
fn describe(failure: &Failure) -> String {
    match failure {
        Failure::Transport(err) => err.to_string(),
        Failure::Status(status) => status.to_string(),
    }
}
