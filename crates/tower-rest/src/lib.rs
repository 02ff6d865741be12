//! A Tower-based HTTP client toolkit.
//!
//! `tower-rest` sends HTTP requests through a composable pipeline. The
//! terminal step is an *executor*, any [`tower::Service`] from
//! [`HttpRequest`] to [`HttpResponse`]; *middlewares* are Tower layers that
//! wrap one executor into another. On top of that sit a request builder, a
//! [`Client`] with synchronous-style and background calls, and ready-made
//! middlewares for retrying and dump logging.
//!
//! # Crates
//!
//! - `tower-rest-core`: bodies, executors, middleware chaining, the
//!   [`Response`] handle
//! - `tower-rest-retry` (`retry` feature, on by default): retries with
//!   backoff and `Retry-After` handling
//! - `tower-rest-logging` (`logging` feature, on by default): wire-style
//!   request/response dumps
//! - `tower-rest-dispatch`: background tasks with ordered fan-in
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tower_rest::{Client, LoggingLayer, Request, RetryLayer, TracingSink};
//!
//! # async fn example() -> Result<(), tower_rest::Error> {
//! let client = Client::builder()
//!     .middleware(LoggingLayer::new(TracingSink::default()))
//!     .middleware(RetryLayer::new(4, Duration::from_millis(250)))
//!     .build()?;
//!
//! // One call, fully buffered.
//! let mut resp = client
//!     .send(Request::get("https://api.example.com/users").query("page", "1"))
//!     .await?;
//! let users: serde_json::Value = resp.json().await?;
//!
//! // Several calls at once, results in request order.
//! let results = client
//!     .send_group_async((1..=3).map(|id| Request::get(format!("https://api.example.com/users/{id}"))))
//!     .await;
//! # let _ = (users, results);
//! # Ok(())
//! # }
//! ```
//!
//! Middlewares run in the order they are added: with the builder above a
//! request is logged once, and each retry attempt happens inside the logging
//! layer.
//!
//! ## Feature Flags
//!
//! - `retry`, `logging`: the middleware crates (default)
//! - `tracing`: diagnostics from retries, dispatch, and timeouts
//! - `metrics`: retry and dispatch counters

mod client;
mod multipart;
mod request;
mod transport;

pub use client::{AsyncGroup, AsyncResponse, AsyncResult, Client, ClientBuilder, DEFAULT_TIMEOUT};
pub use multipart::{Form, Part};
pub use request::Request;
pub use transport::{HttpTransport, TransportConfig};

pub use tower_rest_core as core;
pub use tower_rest_core::{
    box_executor, chain, drain_and_close, executor_fn, middleware_fn, Body, BoxExecutor,
    BoxMiddleware, CancellationToken, Error, HttpRequest, HttpResponse, Response, StreamConfig,
};

pub use tower_rest_dispatch as dispatch;
pub use tower_rest_dispatch::{AsyncReceiver, DispatchError, Dispatcher, Spawner};

#[cfg(feature = "retry")]
pub use tower_rest_retry as retry;
#[cfg(feature = "retry")]
pub use tower_rest_retry::{RetryConfig, RetryLayer};

#[cfg(feature = "logging")]
pub use tower_rest_logging as logging;
#[cfg(feature = "logging")]
pub use tower_rest_logging::{LoggingLayer, MemorySink, TracingSink, WriterSink};
