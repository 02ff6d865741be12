//! Request/response dump logging for tower-rest executors.
//!
//! [`LoggingLayer`] writes a wire-style dump of every outgoing request and
//! incoming response to a [`LogSink`]. Each entry is framed by a marker line:
//!
//! | entry | written when |
//! |---|---|
//! | `=== Request ===` | before the request is sent |
//! | `=== Request Dump Error: <cause> ===` | the request body could not be read for the dump |
//! | `=== Request Error: <cause> ===` | the inner executor failed |
//! | `=== Response ===` | a response arrived |
//! | `=== Response Dump Error: <cause> ===` | the response body could not be read for the dump |
//!
//! Logging never changes the outcome of a call. Dump failures are written to
//! the sink and swallowed; bodies read for a dump are handed on unchanged,
//! and a body whose read failed replays the bytes read so far and then fails
//! with the same kind of error. Executor errors are logged and propagated.
//!
//! Dumps may contain credentials. Use [`LoggingConfigBuilder::redactor`] to
//! mask them.
//!
//! # Examples
//!
//! ```
//! use tower::{Layer, ServiceExt};
//! use tower_rest_core::{executor_fn, Body, Error, HttpRequest, HttpResponse};
//! use tower_rest_logging::{LoggingLayer, MemorySink};
//!
//! # async fn example() -> Result<(), Error> {
//! let sink = MemorySink::new();
//! let executor = LoggingLayer::builder(sink.clone())
//!     .dump_response_body(false)
//!     .build()
//!     .layer(executor_fn(|_req: HttpRequest| async move {
//!         Ok::<_, Error>(HttpResponse::new(Body::from("pong")))
//!     }));
//!
//! let req = http::Request::get("http://localhost/ping")
//!     .body(Body::empty())
//!     .map_err(Error::build)?;
//! executor.oneshot(req).await?;
//! assert!(sink.contents().contains("=== Request ===\nGET /ping HTTP/1.1\r\n"));
//! # Ok(())
//! # }
//! ```

mod config;
mod dump;
mod layer;
mod sink;

pub use config::{LoggingConfig, LoggingConfigBuilder, Redactor};
pub use dump::{dump_request, dump_response};
pub use layer::LoggingLayer;
pub use sink::{LogSink, MemorySink, TracingSink, WriterSink};

use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Service, ServiceExt};
use tower_rest_core::{Body, Error, HttpRequest, HttpResponse};

/// A Tower [`Service`] that logs the exchanges of its inner executor.
pub struct Logging<S> {
    inner: S,
    config: Arc<LoggingConfig>,
}

impl<S> Logging<S> {
    pub fn new(inner: S, config: Arc<LoggingConfig>) -> Self {
        Self { inner, config }
    }
}

impl<S: Clone> Clone for Logging<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for Logging<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logging")
            .field("inner", &self.inner)
            .field("config", &self.config)
            .finish()
    }
}

impl<S> Service<HttpRequest> for Logging<S>
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
        let mut inner = self.inner.clone();
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let body = log_request(&config, &parts, body).await;
            let req = http::Request::from_parts(parts, body);

            let result = match inner.ready().await {
                Ok(svc) => svc.call(req).await,
                Err(err) => Err(err),
            };

            match result {
                Ok(resp) => Ok(log_response(&config, resp).await),
                Err(err) => {
                    config.write(&format!("=== Request Error: {err} ===\n"));
                    Err(err)
                }
            }
        })
    }
}

/// Writes the request entry and returns the body to send.
async fn log_request(
    config: &LoggingConfig,
    parts: &http::request::Parts,
    body: Body,
) -> Body {
    if !config.dump_request_body || body.is_empty() {
        let dump = dump::dump_request(parts, None);
        config.write(&format!("=== Request ===\n{}\n", config.redact(dump)));
        return body;
    }

    match body.collect_partial().await {
        (bytes, None) => {
            let dump = dump::dump_request(parts, Some(&bytes));
            config.write(&format!("=== Request ===\n{}\n", config.redact(dump)));
            Body::from(bytes)
        }
        (prefix, Some(err)) => {
            config.write(&format!("=== Request Dump Error: {err} ===\n"));
            dump::replay_failure(prefix, &err)
        }
    }
}

/// Writes the response entry and returns the response with an equivalent
/// body.
async fn log_response(config: &LoggingConfig, resp: HttpResponse) -> HttpResponse {
    let (parts, body) = resp.into_parts();
    if !config.dump_response_body || body.is_empty() {
        let dump = dump::dump_response(&parts, None);
        config.write(&format!("=== Response ===\n{}\n", config.redact(dump)));
        return http::Response::from_parts(parts, body);
    }

    let body = match body.collect_partial().await {
        (bytes, None) => {
            let dump = dump::dump_response(&parts, Some(&bytes));
            config.write(&format!("=== Response ===\n{}\n", config.redact(dump)));
            Body::from(bytes)
        }
        (prefix, Some(err)) => {
            config.write(&format!("=== Response Dump Error: {err} ===\n"));
            dump::replay_failure(prefix, &err)
        }
    };
    http::Response::from_parts(parts, body)
}
