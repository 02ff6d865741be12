//! Request and response bodies.
//!
//! [`Body`] is either empty, a fully buffered [`Bytes`] value, or a boxed
//! byte stream. It implements [`AsyncRead`] so the same read path serves
//! buffered and streamed content.
//!
//! [`ReplayableBody`] keeps the bytes of a body that has been read once and
//! hands out a fresh [`Body`] cursor each time one is needed. Retries and
//! logging rely on it to re-send or re-expose a body without aliasing a
//! partially consumed stream.

use crate::error::{BoxError, Error};
use bytes::{Buf, Bytes};
use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio_util::io::{ReaderStream, StreamReader};

type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// The body of an HTTP request or response.
pub struct Body {
    kind: Kind,
}

enum Kind {
    Empty,
    Full(Bytes),
    Stream(StreamReader<ByteStream, Bytes>),
}

impl Body {
    /// Creates an empty body.
    pub fn empty() -> Self {
        Self { kind: Kind::Empty }
    }

    /// Creates a body from a stream of byte chunks.
    ///
    /// Stream errors surface as [`io::Error`]s when the body is read.
    pub fn from_stream<S, B, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: Into<Bytes> + 'static,
        E: Into<BoxError> + 'static,
    {
        let stream: ByteStream = stream
            .map_ok(Into::<Bytes>::into)
            .map_err(|err| into_io_error(err.into()))
            .boxed();
        Self {
            kind: Kind::Stream(StreamReader::new(stream)),
        }
    }

    /// Creates a body that reads from an [`AsyncRead`] source.
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self::from_stream(ReaderStream::new(reader))
    }

    /// Returns `true` if the body carries no content.
    ///
    /// Streaming bodies are never considered empty because their length is
    /// unknown until they are read.
    pub fn is_empty(&self) -> bool {
        match &self.kind {
            Kind::Empty => true,
            Kind::Full(bytes) => bytes.is_empty(),
            Kind::Stream(_) => false,
        }
    }

    /// Returns the remaining content if the body is fully buffered.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match &self.kind {
            Kind::Full(bytes) => Some(bytes),
            Kind::Empty | Kind::Stream(_) => None,
        }
    }

    /// Reads the whole body into memory.
    pub async fn collect(self) -> Result<Bytes, Error> {
        match self.kind {
            Kind::Empty => Ok(Bytes::new()),
            Kind::Full(bytes) => Ok(bytes),
            Kind::Stream(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf).await.map_err(Error::Body)?;
                Ok(Bytes::from(buf))
            }
        }
    }

    /// Reads until end of stream or the first error.
    ///
    /// Returns every byte read before the failure together with the failure,
    /// so callers can rebuild an equivalent body.
    pub async fn collect_partial(self) -> (Bytes, Option<io::Error>) {
        match self.kind {
            Kind::Empty => (Bytes::new(), None),
            Kind::Full(bytes) => (bytes, None),
            Kind::Stream(mut reader) => {
                let mut buf = Vec::new();
                let err = reader.read_to_end(&mut buf).await.err();
                (Bytes::from(buf), err)
            }
        }
    }

    /// Converts the body into a stream of chunks.
    pub fn into_data_stream(self) -> BoxStream<'static, io::Result<Bytes>> {
        match self.kind {
            Kind::Empty => stream::empty().boxed(),
            Kind::Full(bytes) => stream::once(async move { Ok(bytes) }).boxed(),
            Kind::Stream(reader) => {
                // Bytes already pulled from the stream but not yet read go first.
                let (inner, chunk) = reader.into_inner_with_chunk();
                match chunk {
                    Some(chunk) => stream::once(async move { Ok(chunk) }).chain(inner).boxed(),
                    None => inner,
                }
            }
        }
    }

    /// Reads up to `buf.len()` bytes. Returns `0` at end of stream.
    pub async fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read(buf).await
    }
}

impl AsyncRead for Body {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match &mut this.kind {
            Kind::Empty => Poll::Ready(Ok(())),
            Kind::Full(bytes) => {
                let n = bytes.len().min(buf.remaining());
                buf.put_slice(&bytes[..n]);
                bytes.advance(n);
                Poll::Ready(Ok(()))
            }
            Kind::Stream(reader) => Pin::new(reader).poll_read(cx, buf),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Empty => f.write_str("Body::Empty"),
            Kind::Full(bytes) => f.debug_tuple("Body::Full").field(&bytes.len()).finish(),
            Kind::Stream(_) => f.write_str("Body::Stream"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self {
            kind: Kind::Full(bytes),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Bytes::from(bytes).into()
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Bytes::from(text).into()
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Bytes::from_static(text.as_bytes()).into()
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Bytes::from_static(bytes).into()
    }
}

fn into_io_error(err: BoxError) -> io::Error {
    match err.downcast::<io::Error>() {
        Ok(io_err) => *io_err,
        Err(other) => io::Error::other(other),
    }
}

/// A body that has been read once and can be replayed any number of times.
#[derive(Clone, Debug, Default)]
pub struct ReplayableBody {
    bytes: Bytes,
}

impl ReplayableBody {
    /// Reads `body` to the end and keeps its bytes.
    pub async fn capture(body: Body) -> Result<Self, Error> {
        Ok(Self {
            bytes: body.collect().await?,
        })
    }

    /// Wraps bytes that are already in memory.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Returns a fresh, unread body over the captured bytes.
    pub fn body(&self) -> Body {
        Body::from(self.bytes.clone())
    }

    /// The captured bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Number of captured bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
