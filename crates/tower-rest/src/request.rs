//! Request construction.

use crate::multipart::Form;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::Method;
use reqwest::Url;
use serde::Serialize;
use std::fmt;
use tower_rest_core::{Body, CancellationToken, Error, HttpRequest};

/// A request under construction.
///
/// Builder methods never fail. Problems that can only be detected while
/// assembling the body (a value that cannot be encoded as JSON, an invalid
/// multipart part) are kept and reported by [`Request::build`], before any
/// network traffic happens.
///
/// Headers are keyed case-insensitively and the last value set for a name
/// wins. Query parameters keep their insertion order and may repeat; they
/// are appended after any query already present in the URL.
///
/// # Examples
///
/// ```
/// use tower_rest::Request;
///
/// let req = Request::get("https://api.example.com/items?page=2")
///     .header("Accept", "application/json")
///     .query("tag", "a")
///     .query("tag", "b")
///     .build()
///     .unwrap();
///
/// assert_eq!(req.uri(), "https://api.example.com/items?page=2&tag=a&tag=b");
/// assert_eq!(req.headers()["accept"], "application/json");
/// ```
pub struct Request {
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    body: Option<Body>,
    cancellation: Option<CancellationToken>,
    deferred: Option<Error>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
            cancellation: None,
            deferred: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::PATCH, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn head(url: impl Into<String>) -> Self {
        Self::new(Method::HEAD, url)
    }

    /// Sets a header, replacing any earlier value for the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name.into(), value.into());
        self
    }

    /// Sets several headers. See [`Request::header`].
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self.set_header(name.into(), value.into());
        }
        self
    }

    /// Appends a query parameter. Repeated names are kept.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Sets a raw body.
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the body to the JSON encoding of `value` and the content type to
    /// `application/json`.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(encoded) => {
                self.body = Some(Body::from(encoded));
                self.set_header(CONTENT_TYPE.as_str().to_owned(), "application/json".to_owned());
            }
            Err(err) => self.defer(Error::Json(err)),
        }
        self
    }

    /// Sets the body to an encoded `multipart/form-data` form.
    pub fn multipart(mut self, form: Form) -> Self {
        match form.encode() {
            Ok(encoded) => {
                self.body = Some(Body::from(encoded));
                self.set_header(CONTENT_TYPE.as_str().to_owned(), form.content_type());
            }
            Err(err) => self.defer(err),
        }
        self
    }

    /// Attaches a token that stops the call before its next attempt or
    /// during a retry backoff. An attempt already on the wire completes.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// The value set for header `name`, compared case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn query_params(&self) -> &[(String, String)] {
        &self.query
    }

    /// Assembles the wire request.
    ///
    /// Errors are reported in this order: a deferred body error, an empty
    /// URL, an unparseable URL, then an invalid header or method.
    pub fn build(self) -> Result<HttpRequest, Error> {
        if let Some(err) = self.deferred {
            return Err(err);
        }
        if self.url.is_empty() {
            return Err(Error::EmptyUrl);
        }

        let mut url = Url::parse(&self.url).map_err(|err| Error::InvalidUrl {
            url: self.url.clone(),
            source: Box::new(err),
        })?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }

        let mut builder = http::Request::builder()
            .method(self.method)
            .uri(url.as_str());
        if let Some(headers) = builder.headers_mut() {
            for (name, value) in &self.headers {
                let name = HeaderName::from_bytes(name.as_bytes()).map_err(Error::build)?;
                let value = HeaderValue::from_str(value).map_err(Error::build)?;
                headers.insert(name, value);
            }
        }
        if let Some(token) = self.cancellation {
            builder = builder.extension(token);
        }

        builder
            .body(self.body.unwrap_or_default())
            .map_err(Error::build)
    }

    fn set_header(&mut self, name: String, value: String) {
        let name = name.to_ascii_lowercase();
        match self.headers.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name, value)),
        }
    }

    fn defer(&mut self, err: Error) {
        // The first failure is the one worth reporting.
        if self.deferred.is_none() {
            self.deferred = Some(err);
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("query", &self.query)
            .field("body", &self.body)
            .field("deferred", &self.deferred)
            .finish()
    }
}
