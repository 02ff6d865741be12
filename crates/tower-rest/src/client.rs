//! The client facade.

use crate::request::Request;
use crate::transport::{HttpTransport, TransportConfig};
use bytes::Bytes;
use pin_project_lite::pin_project;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::{Layer, Service, ServiceExt};
use tower_rest_core::{
    box_executor, chain, Body, BoxExecutor, BoxMiddleware, Error, HttpRequest, HttpResponse,
    Response,
};
use tower_rest_dispatch::{AsyncReceiver, Dispatcher, Spawner, TokioSpawner};

#[cfg(feature = "tracing")]
use tracing::debug;

/// Default time limit for a call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The outcome of an asynchronous call.
pub type AsyncResult = Result<Response, Error>;

/// An HTTP client running requests through a middleware chain.
///
/// Cloning is cheap: clones share the chain and the transport.
///
/// # Examples
///
/// ```rust,no_run
/// use std::time::Duration;
/// use tower_rest::{Client, RetryLayer};
///
/// # async fn example() -> Result<(), tower_rest::Error> {
/// let client = Client::builder()
///     .timeout(Duration::from_secs(10))
///     .middleware(RetryLayer::new(3, Duration::from_millis(200)))
///     .build()?;
///
/// let mut resp = client.get("https://api.example.com/health", [("accept", "text/plain")]).await?;
/// println!("{}: {}", resp.status(), resp.text().await?);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client<S = TokioSpawner> {
    executor: BoxExecutor,
    timeout: Duration,
    auto_buffer: bool,
    dispatcher: Dispatcher<S>,
}

impl Client {
    /// A client with the default transport and settings.
    pub fn new() -> Result<Self, Error> {
        Self::builder().build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }
}

impl<S: Spawner> Client<S> {
    /// The fully decorated executor.
    pub fn executor(&self) -> &BoxExecutor {
        &self.executor
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn auto_buffer(&self) -> bool {
        self.auto_buffer
    }

    /// Sends `req` and returns its response.
    ///
    /// The request is built first; a build error is returned without any
    /// network traffic. With auto-buffering on, the whole body is read
    /// within the timeout and the returned response holds it in memory.
    pub fn send(
        &self,
        req: Request,
    ) -> impl Future<Output = Result<Response, Error>> + Send + 'static {
        execute(self.executor.clone(), self.timeout, self.auto_buffer, req)
    }

    /// Sends `req` and returns as soon as the response head arrives.
    ///
    /// The timeout covers only the wait for the head; the caller reads (or
    /// closes) the streamed body.
    pub fn send_stream(
        &self,
        req: Request,
    ) -> impl Future<Output = Result<Response, Error>> + Send + 'static {
        execute(self.executor.clone(), self.timeout, false, req)
    }

    /// Runs [`Client::send`] as its own task.
    pub fn send_async(&self, req: Request) -> AsyncResponse {
        AsyncResponse::new(self.dispatcher.dispatch(self.send(req)))
    }

    /// Runs [`Client::send_stream`] as its own task.
    pub fn send_stream_async(&self, req: Request) -> AsyncResponse {
        AsyncResponse::new(self.dispatcher.dispatch(self.send_stream(req)))
    }

    /// Sends every request concurrently. The group resolves to one result per
    /// request, in request order.
    pub fn send_group_async<I>(&self, requests: I) -> AsyncGroup
    where
        I: IntoIterator<Item = Request>,
    {
        let responses: Vec<_> = requests
            .into_iter()
            .map(|req| self.send_async(req))
            .collect();
        self.join(responses)
    }

    /// Waits for several pending calls and collects their results in the
    /// order given.
    pub fn join<I>(&self, responses: I) -> AsyncGroup
    where
        I: IntoIterator<Item = AsyncResponse>,
    {
        let responses: Vec<_> = responses.into_iter().collect();
        let len = responses.len();
        AsyncGroup {
            rx: self.dispatcher.join(responses),
            len,
        }
    }

    /// Sends a GET request with the given headers.
    pub fn get<H, K, V>(
        &self,
        url: &str,
        headers: H,
    ) -> impl Future<Output = Result<Response, Error>> + Send + 'static
    where
        H: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.send(Request::get(url).headers(headers))
    }

    /// Sends a POST request with the given body and headers.
    pub fn post<H, K, V>(
        &self,
        url: &str,
        body: impl Into<Bytes>,
        headers: H,
    ) -> impl Future<Output = Result<Response, Error>> + Send + 'static
    where
        H: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let body: Bytes = body.into();
        self.send(Request::post(url).body(body).headers(headers))
    }

    pub fn get_async<H, K, V>(&self, url: &str, headers: H) -> AsyncResponse
    where
        H: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.send_async(Request::get(url).headers(headers))
    }

    pub fn post_async<H, K, V>(
        &self,
        url: &str,
        body: impl Into<Bytes>,
        headers: H,
    ) -> AsyncResponse
    where
        H: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let body: Bytes = body.into();
        self.send_async(Request::post(url).body(body).headers(headers))
    }
}

/// Builds `req` and runs it through `executor` within `timeout` (zero means
/// no limit), reading the body into memory when `buffer` is set.
async fn execute(
    executor: BoxExecutor,
    timeout: Duration,
    buffer: bool,
    req: Request,
) -> Result<Response, Error> {
    let req = req.build()?;
    let call = async move {
        let resp = executor.oneshot(req).await?;
        if !buffer {
            return Ok(Response::from(resp));
        }
        let (parts, body) = resp.into_parts();
        let bytes = body.collect().await?;
        Ok(Response::from(HttpResponse::from_parts(parts, Body::from(bytes))))
    };

    if timeout.is_zero() {
        return call.await;
    }
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            #[cfg(feature = "tracing")]
            debug!(?timeout, "call timed out");
            Err(Error::Timeout(timeout))
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for Client<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("timeout", &self.timeout)
            .field("auto_buffer", &self.auto_buffer)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Client`].
///
/// The terminal executor is chosen in this order: a custom reqwest client,
/// a custom transport, a [`TransportConfig`], and finally a default
/// [`HttpTransport`].
pub struct ClientBuilder<S = TokioSpawner> {
    http_client: Option<reqwest::Client>,
    transport: Option<BoxExecutor>,
    transport_config: Option<TransportConfig>,
    middlewares: Vec<BoxMiddleware>,
    timeout: Duration,
    auto_buffer: bool,
    dispatcher: Dispatcher<S>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            http_client: None,
            transport: None,
            transport_config: None,
            middlewares: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            auto_buffer: true,
            dispatcher: Dispatcher::new(),
        }
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Spawner> ClientBuilder<S> {
    /// Uses `transport` as the terminal executor.
    pub fn transport<T>(mut self, transport: T) -> Self
    where
        T: Service<HttpRequest, Response = HttpResponse, Error = Error> + Clone + Send + 'static,
        T::Future: Send + 'static,
    {
        self.transport = Some(box_executor(transport));
        self
    }

    /// Sends through an existing reqwest client.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn transport_config(mut self, config: TransportConfig) -> Self {
        self.transport_config = Some(config);
        self
    }

    /// Limit for each call. Defaults to 30 seconds; zero disables it.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Appends a middleware. The first one added runs outermost.
    pub fn middleware<L>(mut self, layer: L) -> Self
    where
        L: Layer<BoxExecutor> + Send + Sync + 'static,
        L::Service: Service<HttpRequest, Response = HttpResponse, Error = Error>
            + Clone
            + Send
            + 'static,
        <L::Service as Service<HttpRequest>>::Future: Send + 'static,
    {
        self.middlewares.push(BoxMiddleware::new(layer));
        self
    }

    /// Appends several already boxed middlewares, in order.
    pub fn middlewares<I>(mut self, middlewares: I) -> Self
    where
        I: IntoIterator<Item = BoxMiddleware>,
    {
        self.middlewares.extend(middlewares);
        self
    }

    /// Whether [`Client::send`] reads the whole body before returning.
    /// Defaults to `true`.
    pub fn auto_buffer(mut self, enabled: bool) -> Self {
        self.auto_buffer = enabled;
        self
    }

    /// Runs asynchronous calls through `dispatcher`.
    pub fn dispatcher<S2: Spawner>(self, dispatcher: Dispatcher<S2>) -> ClientBuilder<S2> {
        ClientBuilder {
            http_client: self.http_client,
            transport: self.transport,
            transport_config: self.transport_config,
            middlewares: self.middlewares,
            timeout: self.timeout,
            auto_buffer: self.auto_buffer,
            dispatcher,
        }
    }

    pub fn build(self) -> Result<Client<S>, Error> {
        let terminal = match (self.http_client, self.transport, self.transport_config) {
            (Some(client), _, _) => box_executor(HttpTransport::from_client(client)),
            (None, Some(transport), _) => transport,
            (None, None, Some(config)) => box_executor(HttpTransport::from_config(&config)?),
            (None, None, None) => box_executor(HttpTransport::new()?),
        };

        Ok(Client {
            executor: chain(terminal, self.middlewares),
            timeout: self.timeout,
            auto_buffer: self.auto_buffer,
            dispatcher: self.dispatcher,
        })
    }
}

impl<S: fmt::Debug> fmt::Debug for ClientBuilder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("http_client", &self.http_client.is_some())
            .field("transport", &self.transport.is_some())
            .field("transport_config", &self.transport_config)
            .field("middlewares", &self.middlewares.len())
            .field("timeout", &self.timeout)
            .field("auto_buffer", &self.auto_buffer)
            .finish()
    }
}

pin_project! {
    /// A call running in the background. Resolves to its [`AsyncResult`].
    #[derive(Debug)]
    pub struct AsyncResponse {
        #[pin]
        rx: AsyncReceiver<AsyncResult>,
    }
}

impl AsyncResponse {
    fn new(rx: AsyncReceiver<AsyncResult>) -> Self {
        Self { rx }
    }

    /// An already finished call.
    pub fn ready(result: AsyncResult) -> Self {
        Self::new(AsyncReceiver::ready(result))
    }

    /// Takes the result if the call has finished.
    pub fn try_result(&mut self) -> Option<AsyncResult> {
        self.rx.try_recv().map(|r| r.unwrap_or_else(|err| Err(err.into())))
    }
}

impl Future for AsyncResponse {
    type Output = AsyncResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.project()
            .rx
            .poll(cx)
            .map(|r| r.unwrap_or_else(|err| Err(err.into())))
    }
}

pin_project! {
    /// Several calls running in the background. Resolves to their results in
    /// the order the calls were given.
    #[derive(Debug)]
    pub struct AsyncGroup {
        #[pin]
        rx: AsyncReceiver<Vec<AsyncResult>>,
        len: usize,
    }
}

impl AsyncGroup {
    /// Number of calls in the group.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Future for AsyncGroup {
    type Output = Vec<AsyncResult>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let len = *this.len;
        this.rx.poll(cx).map(|r| {
            r.unwrap_or_else(|_| (0..len).map(|_| Err(Error::TaskCancelled)).collect())
        })
    }
}
