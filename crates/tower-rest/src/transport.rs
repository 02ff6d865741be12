//! The reqwest-backed terminal executor.

use futures::future::BoxFuture;
use reqwest::{Certificate, Url};
use std::fmt;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;
use tower_rest_core::{Body, Error, HttpRequest, HttpResponse};

/// Connection settings for [`HttpTransport`].
///
/// Every option left unset keeps reqwest's default.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tower_rest::{HttpTransport, TransportConfig};
///
/// let transport = HttpTransport::from_config(
///     &TransportConfig::new()
///         .connect_timeout(Duration::from_secs(5))
///         .pool_max_idle_per_host(16)
///         .user_agent("inventory-sync/1.0"),
/// )
/// .unwrap();
/// # let _ = transport;
/// ```
#[derive(Clone, Default)]
pub struct TransportConfig {
    connect_timeout: Option<Duration>,
    pool_idle_timeout: Option<Duration>,
    pool_max_idle_per_host: Option<usize>,
    http2_prior_knowledge: bool,
    root_certificates: Vec<Certificate>,
    user_agent: Option<String>,
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// How long an idle pooled connection is kept.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = Some(max);
        self
    }

    /// Speak HTTP/2 without negotiating it first.
    pub fn http2_prior_knowledge(mut self, enabled: bool) -> Self {
        self.http2_prior_knowledge = enabled;
        self
    }

    /// Trusts `certificate` in addition to the built-in roots.
    pub fn add_root_certificate(mut self, certificate: Certificate) -> Self {
        self.root_certificates.push(certificate);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Builds a reqwest client with these settings.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = self.pool_idle_timeout {
            builder = builder.pool_idle_timeout(timeout);
        }
        if let Some(max) = self.pool_max_idle_per_host {
            builder = builder.pool_max_idle_per_host(max);
        }
        if self.http2_prior_knowledge {
            builder = builder.http2_prior_knowledge();
        }
        for certificate in &self.root_certificates {
            builder = builder.add_root_certificate(certificate.clone());
        }
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }
        builder.build().map_err(Error::build)
    }
}

impl fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field("connect_timeout", &self.connect_timeout)
            .field("pool_idle_timeout", &self.pool_idle_timeout)
            .field("pool_max_idle_per_host", &self.pool_max_idle_per_host)
            .field("http2_prior_knowledge", &self.http2_prior_knowledge)
            .field("root_certificates", &self.root_certificates.len())
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Sends requests with a [`reqwest::Client`].
///
/// Buffered request bodies are sent as-is and streamed ones are forwarded as
/// streams. The response body is always streamed. An exchange that has been
/// sent runs to completion even if the request's cancellation token fires;
/// cancellation is observed by the retry layer between attempts.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// A transport over a default reqwest client.
    pub fn new() -> Result<Self, Error> {
        Self::from_config(&TransportConfig::default())
    }

    pub fn from_config(config: &TransportConfig) -> Result<Self, Error> {
        Ok(Self::from_client(config.build_client()?))
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl Service<HttpRequest> for HttpTransport {
    type Response = HttpResponse;
    type Error = Error;
    type Future = BoxFuture<'static, Result<HttpResponse, Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: HttpRequest) -> Self::Future {
        let client = self.client.clone();
        Box::pin(async move {
            let request = into_reqwest(&client, req)?;
            let response = client.execute(request).await.map_err(Error::transport)?;
            Ok(from_reqwest(response))
        })
    }
}

fn into_reqwest(client: &reqwest::Client, req: HttpRequest) -> Result<reqwest::Request, Error> {
    let (parts, body) = req.into_parts();
    let target = parts.uri.to_string();
    let url = Url::parse(&target).map_err(|err| Error::InvalidUrl {
        url: target,
        source: Box::new(err),
    })?;

    let mut builder = client.request(parts.method, url).headers(parts.headers);
    if let Some(bytes) = body.as_bytes() {
        builder = builder.body(bytes.clone());
    } else if !body.is_empty() {
        builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
    }
    builder.build().map_err(Error::build)
}

fn from_reqwest(mut response: reqwest::Response) -> HttpResponse {
    let status = response.status();
    let version = response.version();
    let headers = std::mem::take(response.headers_mut());

    let mut out = http::Response::new(Body::from_stream(response.bytes_stream()));
    *out.status_mut() = status;
    *out.version_mut() = version;
    *out.headers_mut() = headers;
    out
}
