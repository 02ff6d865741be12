//! Middleware composition.
//!
//! A middleware is any [`tower::Layer`] that turns an executor into another
//! executor. [`BoxMiddleware`] erases the concrete layer type so that a list
//! of heterogeneous middlewares can be kept and applied at runtime, and
//! [`chain`] applies such a list around a terminal executor.
//!
//! Ordering is outside-in by position: the first middleware runs first on
//! the way in and last on the way out; the last one sits next to the
//! terminal executor.
//!
//! ```
//! use tower_rest_core::{chain, executor_fn, middleware_fn, Body, BoxMiddleware};
//! use tower_rest_core::{Error, HttpRequest, HttpResponse};
//! use tower::ServiceExt;
//!
//! # async fn example() -> Result<(), Error> {
//! let terminal = executor_fn(|_req: HttpRequest| async move {
//!     Ok::<_, Error>(HttpResponse::new(Body::from("ok")))
//! });
//! let tag = BoxMiddleware::new(middleware_fn(|mut req: HttpRequest, next| async move {
//!     req.headers_mut().insert("x-tag", "1".parse().unwrap());
//!     next.oneshot(req).await
//! }));
//!
//! let executor = chain(terminal, [tag]);
//! let resp = executor.oneshot(http::Request::new(Body::empty())).await?;
//! assert_eq!(resp.status(), 200);
//! # Ok(())
//! # }
//! ```

use crate::error::Error;
use crate::executor::{box_executor, BoxExecutor, HttpRequest, HttpResponse};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// A type-erased, cloneable middleware.
#[derive(Clone)]
pub struct BoxMiddleware {
    wrap: Arc<dyn Fn(BoxExecutor) -> BoxExecutor + Send + Sync>,
}

impl BoxMiddleware {
    /// Erases the type of `layer`.
    pub fn new<L>(layer: L) -> Self
    where
        L: Layer<BoxExecutor> + Send + Sync + 'static,
        L::Service: Service<HttpRequest, Response = HttpResponse, Error = Error>
            + Clone
            + Send
            + 'static,
        <L::Service as Service<HttpRequest>>::Future: Send + 'static,
    {
        Self {
            wrap: Arc::new(move |inner| box_executor(layer.layer(inner))),
        }
    }
}

impl Layer<BoxExecutor> for BoxMiddleware {
    type Service = BoxExecutor;

    fn layer(&self, inner: BoxExecutor) -> Self::Service {
        (self.wrap)(inner)
    }
}

impl fmt::Debug for BoxMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxMiddleware").finish_non_exhaustive()
    }
}

/// Wraps `terminal` with `middlewares`, outermost first.
///
/// The list is folded from the back: the last middleware wraps the terminal
/// executor, the first ends up outermost. An empty list yields the terminal
/// executor unchanged (boxed).
pub fn chain<S, I>(terminal: S, middlewares: I) -> BoxExecutor
where
    S: Service<HttpRequest, Response = HttpResponse, Error = Error> + Clone + Send + 'static,
    S::Future: Send + 'static,
    I: IntoIterator<Item = BoxMiddleware>,
    I::IntoIter: DoubleEndedIterator,
{
    middlewares
        .into_iter()
        .rev()
        .fold(box_executor(terminal), |inner, middleware| {
            middleware.layer(inner)
        })
}

/// Creates a middleware from an async closure receiving the request and the
/// next executor in the chain.
///
/// The closure may mutate the request, short-circuit by returning without
/// calling `next`, or inspect the response on its way out.
pub fn middleware_fn<F, Fut>(f: F) -> MiddlewareFn<F>
where
    F: Fn(HttpRequest, BoxExecutor) -> Fut + Clone,
    Fut: Future<Output = Result<HttpResponse, Error>>,
{
    MiddlewareFn { f }
}

/// A middleware backed by a closure. See [`middleware_fn`].
#[derive(Clone)]
pub struct MiddlewareFn<F> {
    f: F,
}

impl<F, S> Layer<S> for MiddlewareFn<F>
where
    F: Clone,
    S: Service<HttpRequest, Response = HttpResponse, Error = Error> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Service = MiddlewareFnService<F>;

    fn layer(&self, inner: S) -> Self::Service {
        MiddlewareFnService {
            f: self.f.clone(),
            next: box_executor(inner),
        }
    }
}

impl<F> fmt::Debug for MiddlewareFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareFn")
            .field("f", &std::any::type_name::<F>())
            .finish()
    }
}

/// The executor produced by [`MiddlewareFn`].
#[derive(Clone)]
pub struct MiddlewareFnService<F> {
    f: F,
    next: BoxExecutor,
}

impl<F, Fut> Service<HttpRequest> for MiddlewareFnService<F>
where
    F: Fn(HttpRequest, BoxExecutor) -> Fut,
    Fut: Future<Output = Result<HttpResponse, Error>>,
{
    type Response = HttpResponse;
    type Error = Error;
    type Future = Fut;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // `next` is driven to readiness by the closure when it is called.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: HttpRequest) -> Self::Future {
        (self.f)(req, self.next.clone())
    }
}
