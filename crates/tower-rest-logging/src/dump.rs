//! Wire-style text dumps of requests and responses.
//!
//! Lines end in `\r\n` as on the wire. The head is followed by a blank
//! line and, when included, the body rendered as lossy UTF-8.

use bytes::Bytes;
use futures::stream;
use http::header::HOST;
use http::{request, response, HeaderMap};
use std::fmt::Write;
use std::io;
use tower_rest_core::Body;

/// Dumps a request head, and `body` if given.
pub fn dump_request(parts: &request::Parts, body: Option<&[u8]>) -> String {
    let mut out = String::new();
    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .filter(|pq| !pq.is_empty())
        .unwrap_or("/");
    let _ = write!(out, "{} {} {:?}\r\n", parts.method, target, parts.version);

    let host = parts
        .headers
        .get(HOST)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .or_else(|| parts.uri.authority().map(|a| a.as_str().to_string()));
    if let Some(host) = host {
        let _ = write!(out, "Host: {host}\r\n");
    }

    write_headers(&mut out, &parts.headers, true);
    finish(&mut out, body);
    out
}

/// Dumps a response head, and `body` if given.
pub fn dump_response(parts: &response::Parts, body: Option<&[u8]>) -> String {
    let mut out = String::new();
    let _ = write!(out, "{:?} {}\r\n", parts.version, parts.status);
    write_headers(&mut out, &parts.headers, false);
    finish(&mut out, body);
    out
}

fn write_headers(out: &mut String, headers: &HeaderMap, skip_host: bool) {
    for (name, value) in headers {
        if skip_host && name == HOST {
            continue;
        }
        let _ = write!(
            out,
            "{}: {}\r\n",
            canonical(name.as_str()),
            String::from_utf8_lossy(value.as_bytes())
        );
    }
}

fn finish(out: &mut String, body: Option<&[u8]>) {
    out.push_str("\r\n");
    if let Some(body) = body {
        out.push_str(&String::from_utf8_lossy(body));
    }
}

/// `content-type` -> `Content-Type`.
fn canonical(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        upper = c == '-';
    }
    out
}

/// Rebuilds a body that yields `prefix` and then fails like `err` did.
///
/// `io::Error` is not `Clone`, so the replacement carries the same kind and
/// message.
pub(crate) fn replay_failure(prefix: Bytes, err: &io::Error) -> Body {
    let failure = io::Error::new(err.kind(), err.to_string());
    let mut chunks = Vec::with_capacity(2);
    if !prefix.is_empty() {
        chunks.push(Ok(prefix));
    }
    chunks.push(Err(failure));
    Body::from_stream(stream::iter(chunks))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_line_host_and_headers() {
        let req = http::Request::post("https://api.example.com/v1/items?limit=5")
            .header("content-type", "application/json")
            .header("x-trace", "abc")
            .body(())
            .unwrap();
        let (parts, ()) = req.into_parts();

        let dump = dump_request(&parts, Some(br#"{"a":1}"#));
        assert_eq!(
            dump,
            "POST /v1/items?limit=5 HTTP/1.1\r\n\
             Host: api.example.com\r\n\
             Content-Type: application/json\r\n\
             X-Trace: abc\r\n\
             \r\n\
             {\"a\":1}"
        );
    }

    #[test]
    fn explicit_host_header_wins() {
        let req = http::Request::get("http://10.0.0.1:8080/")
            .header("host", "internal.service")
            .body(())
            .unwrap();
        let (parts, ()) = req.into_parts();
        let dump = dump_request(&parts, None);
        assert!(dump.starts_with("GET / HTTP/1.1\r\nHost: internal.service\r\n\r\n"));
        assert_eq!(dump.matches("Host:").count(), 1);
    }

    #[test]
    fn response_without_body() {
        let resp = http::Response::builder()
            .status(404)
            .header("content-length", "9")
            .body(())
            .unwrap();
        let (parts, ()) = resp.into_parts();
        assert_eq!(
            dump_response(&parts, None),
            "HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\n\r\n"
        );
    }

    #[tokio::test]
    async fn replayed_failure_keeps_prefix_and_kind() {
        let original = io::Error::new(io::ErrorKind::ConnectionReset, "peer went away");
        let body = replay_failure(Bytes::from_static(b"partial"), &original);
        let (prefix, err) = body.collect_partial().await;
        assert_eq!(prefix, "partial");
        let err = err.unwrap();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert_eq!(err.to_string(), "peer went away");
    }
}
