//! Core building blocks for tower-rest.
//!
//! This crate holds the pieces every other tower-rest crate is written
//! against:
//!
//! - [`Body`] and [`ReplayableBody`]: buffered or streamed content, and a
//!   captured copy that can be read any number of times
//! - the executor abstraction ([`HttpRequest`] in, [`HttpResponse`] out),
//!   with [`executor_fn`] and the boxed [`BoxExecutor`]
//! - middleware composition with [`BoxMiddleware`], [`chain`], and
//!   [`middleware_fn`]
//! - the caller-facing [`Response`] handle
//! - the shared [`Error`] type
//! - event hooks for layer observability, keyed by [`RequestTarget`]
//!
//! # Composing a pipeline
//!
//! ```
//! use tower_rest_core::{chain, executor_fn, middleware_fn, Body, BoxMiddleware};
//! use tower_rest_core::{Error, HttpRequest, HttpResponse, Response};
//! use tower::ServiceExt;
//!
//! # async fn example() -> Result<(), Error> {
//! let terminal = executor_fn(|req: HttpRequest| async move {
//!     let auth = req.headers().contains_key("authorization");
//!     let body = if auth { "welcome" } else { "denied" };
//!     Ok::<_, Error>(HttpResponse::new(Body::from(body)))
//! });
//!
//! let auth = BoxMiddleware::new(middleware_fn(|mut req: HttpRequest, next| async move {
//!     req.headers_mut()
//!         .insert("authorization", "Bearer token".parse().unwrap());
//!     next.oneshot(req).await
//! }));
//!
//! let executor = chain(terminal, [auth]);
//! let mut resp = Response::from(executor.oneshot(http::Request::new(Body::empty())).await?);
//! assert_eq!(resp.text().await?, "welcome");
//! # Ok(())
//! # }
//! ```

pub mod body;
pub mod error;
pub mod events;
pub mod executor;
pub mod middleware;
pub mod response;

pub use body::{Body, ReplayableBody};
pub use error::{BoxError, Error};
pub use events::{EventHooks, PipelineEvent, RequestTarget};
pub use executor::{
    box_executor, cancellation_token, executor_fn, BoxExecutor, ExecutorFn, HttpRequest,
    HttpResponse, ReplayableRequest,
};
pub use middleware::{chain, middleware_fn, BoxMiddleware, MiddlewareFn, MiddlewareFnService};
pub use response::{drain_and_close, Response, StreamConfig, DEFAULT_CHUNK_SIZE};
pub use tokio_util::sync::CancellationToken;
