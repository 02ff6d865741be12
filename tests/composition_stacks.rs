//! Composition stack tests.
//!
//! These tests verify how the middlewares behave when stacked in different
//! orders through the client, and that hand-written middlewares compose with
//! the provided ones.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use tower_rest::{
    box_executor, executor_fn, middleware_fn, Body, BoxExecutor, Client, Error, HttpRequest,
    HttpResponse, LoggingLayer, MemorySink, Request, RetryLayer,
};

/// Answers 503 `failures` times, then 200 with the request's auth header
/// echoed back.
fn unstable(calls: Arc<AtomicUsize>, failures: usize) -> BoxExecutor {
    box_executor(executor_fn(move |req: HttpRequest| {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        async move {
            let mut resp = HttpResponse::new(Body::from("done"));
            if n < failures {
                *resp.status_mut() = http::StatusCode::SERVICE_UNAVAILABLE;
            } else if let Some(auth) = req.headers().get("authorization") {
                resp.headers_mut().insert("x-auth", auth.clone());
            }
            Ok::<_, Error>(resp)
        }
    }))
}

fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

#[tokio::test]
async fn logging_outside_retry_sees_one_exchange() {
    let calls = Arc::new(AtomicUsize::new(0));
    let sink = MemorySink::new();
    let client = Client::builder()
        .transport(unstable(Arc::clone(&calls), 2))
        .middleware(LoggingLayer::new(sink.clone()))
        .middleware(RetryLayer::new(3, Duration::from_millis(1)))
        .build()
        .unwrap();

    let resp = client.send(Request::get("http://localhost/jobs")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let log = sink.contents();
    assert_eq!(count(&log, "=== Request ===\n"), 1);
    assert_eq!(count(&log, "=== Response ===\n"), 1);
    assert!(log.contains("HTTP/1.1 200 OK\r\n"));
}

#[tokio::test]
async fn retry_outside_logging_logs_every_attempt() {
    let calls = Arc::new(AtomicUsize::new(0));
    let sink = MemorySink::new();
    let client = Client::builder()
        .transport(unstable(Arc::clone(&calls), 2))
        .middleware(RetryLayer::new(3, Duration::from_millis(1)))
        .middleware(LoggingLayer::new(sink.clone()))
        .build()
        .unwrap();

    client.send(Request::get("http://localhost/jobs")).await.unwrap();

    let log = sink.contents();
    assert_eq!(count(&log, "=== Request ===\n"), 3);
    assert_eq!(count(&log, "HTTP/1.1 503 Service Unavailable\r\n"), 2);
    assert_eq!(count(&log, "HTTP/1.1 200 OK\r\n"), 1);
}

#[tokio::test]
async fn custom_middleware_runs_on_every_attempt() {
    let calls = Arc::new(AtomicUsize::new(0));
    let signed = Arc::new(AtomicUsize::new(0));
    let signer_count = Arc::clone(&signed);

    let signer = middleware_fn(move |mut req: HttpRequest, next: BoxExecutor| {
        signer_count.fetch_add(1, Ordering::SeqCst);
        req.headers_mut()
            .insert("authorization", "Bearer t0k3n".parse().unwrap());
        next.oneshot(req)
    });

    let client = Client::builder()
        .transport(unstable(Arc::clone(&calls), 1))
        .middleware(RetryLayer::new(2, Duration::from_millis(1)))
        .middleware(signer)
        .build()
        .unwrap();

    let resp = client.send(Request::get("http://localhost/secure")).await.unwrap();
    assert_eq!(resp.headers()["x-auth"], "Bearer t0k3n");
    assert_eq!(signed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn chain_is_usable_without_the_client() {
    let calls = Arc::new(AtomicUsize::new(0));
    let sink = MemorySink::new();
    let executor = tower_rest::chain(
        unstable(Arc::clone(&calls), 0),
        [
            tower_rest::BoxMiddleware::new(LoggingLayer::new(sink.clone())),
            tower_rest::BoxMiddleware::new(RetryLayer::new(2, Duration::from_millis(1))),
        ],
    );

    let req = Request::get("http://localhost/direct").build().unwrap();
    let resp = executor.oneshot(req).await.unwrap();
    assert_eq!(resp.into_body().collect().await.unwrap(), "done");
    assert!(sink.contents().starts_with("=== Request ===\nGET /direct HTTP/1.1\r\n"));
}
