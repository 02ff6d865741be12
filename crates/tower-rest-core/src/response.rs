//! The response handle returned to callers.
//!
//! A [`Response`] owns the status line, headers, and body of a completed
//! exchange. The body can be consumed in one of two ways:
//!
//! - **Read fully** with [`Response::bytes`], [`Response::text`],
//!   [`Response::json`], or [`Response::save_to_file`]. Each takes the body,
//!   reads it to the end, and releases it. A second read-fully call fails
//!   with [`Error::BodyConsumed`].
//! - **Stream** with [`Response::stream_chunks`]. The body stays open after
//!   the stream ends; release it with [`Response::close`] or by dropping the
//!   handle.

use crate::body::Body;
use crate::error::Error;
use crate::executor::HttpResponse;
use bytes::Bytes;
use http::{HeaderMap, StatusCode, Version};
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Default read size for [`Response::stream_chunks`].
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Options for [`Response::stream_chunks_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Maximum number of bytes read per chunk. Zero selects
    /// [`DEFAULT_CHUNK_SIZE`].
    pub buffer_size: usize,
}

impl StreamConfig {
    /// Creates a config reading up to `buffer_size` bytes per chunk.
    pub fn new(buffer_size: usize) -> Self {
        Self { buffer_size }
    }

    fn effective_size(&self) -> usize {
        if self.buffer_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            self.buffer_size
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// A response handle.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    body: Option<Body>,
}

impl Response {
    /// The response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The HTTP version of the response.
    pub fn version(&self) -> Version {
        self.version
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns `true` once the body has been read fully or closed.
    pub fn is_closed(&self) -> bool {
        self.body.is_none()
    }

    /// Reads the whole body and returns it.
    pub async fn bytes(&mut self) -> Result<Bytes, Error> {
        self.take_body()?.collect().await
    }

    /// Reads the whole body as UTF-8 text, replacing invalid sequences.
    pub async fn text(&mut self) -> Result<String, Error> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Reads the whole body and deserializes it from JSON.
    pub async fn json<T: DeserializeOwned>(&mut self) -> Result<T, Error> {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Streams the whole body into the file at `path`, creating or
    /// truncating it.
    ///
    /// Returns the number of bytes written. The body is released even when
    /// writing fails.
    pub async fn save_to_file(&mut self, path: impl AsRef<Path>) -> Result<u64, Error> {
        let mut body = self.take_body()?;
        let mut file = tokio::fs::File::create(path).await.map_err(Error::Io)?;
        let written = tokio::io::copy(&mut body, &mut file)
            .await
            .map_err(Error::Io)?;
        file.flush().await.map_err(Error::Io)?;
        Ok(written)
    }

    /// Invokes `callback` with each chunk of the body, reading up to
    /// [`DEFAULT_CHUNK_SIZE`] bytes at a time.
    ///
    /// The body is not closed when the stream ends.
    pub async fn stream_chunks<F>(&mut self, callback: F) -> Result<(), Error>
    where
        F: FnMut(&[u8]),
    {
        self.stream_chunks_with(StreamConfig::default(), callback)
            .await
    }

    /// Like [`Response::stream_chunks`] with an explicit buffer size.
    ///
    /// Chunks are delivered in read order and never merged; empty reads are
    /// skipped.
    pub async fn stream_chunks_with<F>(
        &mut self,
        config: StreamConfig,
        mut callback: F,
    ) -> Result<(), Error>
    where
        F: FnMut(&[u8]),
    {
        let body = self.body.as_mut().ok_or(Error::BodyConsumed)?;
        let mut buf = vec![0u8; config.effective_size()];
        loop {
            let n = body.read_chunk(&mut buf).await.map_err(Error::Body)?;
            if n == 0 {
                return Ok(());
            }
            callback(&buf[..n]);
        }
    }

    /// Releases the body. Calling it again has no effect.
    pub fn close(&mut self) {
        self.body = None;
    }

    /// Converts the handle back into an [`http::Response`].
    ///
    /// A consumed body is replaced by an empty one.
    pub fn into_http(self) -> HttpResponse {
        let mut resp = http::Response::new(self.body.unwrap_or_default());
        *resp.status_mut() = self.status;
        *resp.version_mut() = self.version;
        *resp.headers_mut() = self.headers;
        resp
    }

    fn take_body(&mut self) -> Result<Body, Error> {
        self.body.take().ok_or(Error::BodyConsumed)
    }
}

impl From<HttpResponse> for Response {
    fn from(resp: HttpResponse) -> Self {
        let (parts, body) = resp.into_parts();
        Self {
            status: parts.status,
            version: parts.version,
            headers: parts.headers,
            body: Some(body),
        }
    }
}

/// Reads and discards the body of `resp`.
///
/// Used before retrying so the connection can be reused; read errors are
/// ignored.
pub async fn drain_and_close(resp: HttpResponse) {
    let _ = tokio::io::copy(&mut resp.into_body(), &mut tokio::io::sink()).await;
}
