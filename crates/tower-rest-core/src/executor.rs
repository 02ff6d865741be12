//! The executor abstraction.
//!
//! An executor performs one request/response exchange. It is modelled as a
//! [`tower::Service`] over [`HttpRequest`] that yields an [`HttpResponse`]
//! or an [`Error`], so every Tower combinator applies to it directly.
//!
//! [`executor_fn`] adapts a plain async closure, and [`BoxExecutor`] is the
//! type-erased form that middleware chains operate on.

use crate::body::{Body, ReplayableBody};
use crate::error::Error;
use crate::events::RequestTarget;
use http::{Extensions, HeaderMap, Method, Uri, Version};
use std::future::Future;
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;
use tower::util::BoxCloneService;
use tower::Service;

/// A request ready to be put on the wire.
pub type HttpRequest = http::Request<Body>;

/// A response as produced by an executor.
pub type HttpResponse = http::Response<Body>;

/// A type-erased, cloneable executor.
pub type BoxExecutor = BoxCloneService<HttpRequest, HttpResponse, Error>;

/// Boxes any executor into a [`BoxExecutor`].
pub fn box_executor<S>(executor: S) -> BoxExecutor
where
    S: Service<HttpRequest, Response = HttpResponse, Error = Error> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    BoxCloneService::new(executor)
}

/// Creates an executor from an async closure.
///
/// # Examples
///
/// ```
/// use tower_rest_core::{executor_fn, Body, HttpRequest, HttpResponse};
///
/// let executor = executor_fn(|_req: HttpRequest| async move {
///     Ok::<_, tower_rest_core::Error>(HttpResponse::new(Body::from("ok")))
/// });
/// # let _ = executor;
/// ```
pub fn executor_fn<F, Fut>(f: F) -> ExecutorFn<F>
where
    F: FnMut(HttpRequest) -> Fut,
    Fut: Future<Output = Result<HttpResponse, Error>>,
{
    ExecutorFn { f }
}

/// An executor backed by a closure. See [`executor_fn`].
#[derive(Clone, Copy)]
pub struct ExecutorFn<F> {
    f: F,
}

impl<F, Fut> Service<HttpRequest> for ExecutorFn<F>
where
    F: FnMut(HttpRequest) -> Fut,
    Fut: Future<Output = Result<HttpResponse, Error>>,
{
    type Response = HttpResponse;
    type Error = Error;
    type Future = Fut;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: HttpRequest) -> Self::Future {
        (self.f)(req)
    }
}

impl<F> std::fmt::Debug for ExecutorFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorFn")
            .field("f", &std::any::type_name::<F>())
            .finish()
    }
}

/// Returns the cancellation token attached to a request, if any.
pub fn cancellation_token(extensions: &Extensions) -> Option<&CancellationToken> {
    extensions.get::<CancellationToken>()
}

/// A request whose body has been captured so that independent copies can
/// be produced, one per attempt.
///
/// Each call to [`ReplayableRequest::attempt`] yields a request with its own
/// header map, its own extensions, and a fresh body cursor, so mutations made
/// while handling one attempt never leak into the next.
#[derive(Debug, Clone)]
pub struct ReplayableRequest {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    extensions: Extensions,
    body: Option<ReplayableBody>,
}

impl ReplayableRequest {
    /// Reads the request body (if present) once and keeps the request head.
    ///
    /// Fails with [`Error::Body`] if the body cannot be read.
    pub async fn capture(req: HttpRequest) -> Result<Self, Error> {
        let (parts, body) = req.into_parts();
        let body = if body.is_empty() {
            None
        } else {
            Some(ReplayableBody::capture(body).await?)
        };
        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            extensions: parts.extensions,
            body,
        })
    }

    /// Builds an independent request for one attempt.
    pub fn attempt(&self) -> HttpRequest {
        let body = self
            .body
            .as_ref()
            .map(ReplayableBody::body)
            .unwrap_or_default();
        let mut req = http::Request::new(body);
        *req.method_mut() = self.method.clone();
        *req.uri_mut() = self.uri.clone();
        *req.version_mut() = self.version;
        *req.headers_mut() = self.headers.clone();
        *req.extensions_mut() = self.extensions.clone();
        req
    }

    /// The method and URI every attempt is sent to.
    pub fn target(&self) -> RequestTarget {
        RequestTarget::new(self.method.clone(), self.uri.clone())
    }

    /// The cancellation token carried by the request, if any.
    pub fn cancellation_token(&self) -> Option<&CancellationToken> {
        cancellation_token(&self.extensions)
    }

    /// The captured body, if the request had one.
    pub fn body(&self) -> Option<&ReplayableBody> {
        self.body.as_ref()
    }
}
