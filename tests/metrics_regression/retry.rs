//! Retry metrics regression tests

use super::helpers::*;
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::{Layer, ServiceExt};
use tower_rest_core::{executor_fn, Body, CancellationToken, Error, HttpRequest, HttpResponse};
use tower_rest_retry::RetryLayer;

fn request() -> HttpRequest {
    http::Request::new(Body::empty())
}

#[tokio::test]
#[serial]
async fn retry_metrics_exist() {
    init_recorder();

    let layer = RetryLayer::builder()
        .name("test_retry")
        .max_attempts(3)
        .fixed_backoff(Duration::from_millis(10))
        .build();

    let counter = Arc::new(AtomicUsize::new(0));
    let counter_clone = Arc::clone(&counter);
    let service = executor_fn(move |_req: HttpRequest| {
        let count = counter_clone.fetch_add(1, Ordering::SeqCst);
        async move {
            if count < 2 {
                Err(Error::transport("connection refused"))
            } else {
                Ok(HttpResponse::new(Body::empty()))
            }
        }
    });

    // Make a call that will retry and eventually succeed
    let _ = layer.layer(service).oneshot(request()).await;

    // Verify counter metrics
    assert_counter_exists("retry_calls_total");
    assert_metric_has_label("retry_calls_total", "retry", "test_retry");
    assert_metric_has_label("retry_calls_total", "result", "success");

    assert_counter_exists("retry_attempts_total");
    assert_metric_has_label("retry_attempts_total", "retry", "test_retry");

    // Verify histogram metric
    assert_histogram_exists("retry_attempts");
    assert_metric_has_label("retry_attempts", "retry", "test_retry");
}

#[tokio::test]
#[serial]
async fn retry_exhausted_metrics() {
    init_recorder();

    let layer = RetryLayer::builder()
        .name("exhausted_retry")
        .max_attempts(2)
        .fixed_backoff(Duration::from_millis(10))
        .build();

    let service = executor_fn(|_req: HttpRequest| async {
        let mut resp = HttpResponse::new(Body::empty());
        *resp.status_mut() = http::StatusCode::BAD_GATEWAY;
        Ok::<_, Error>(resp)
    });

    // Make a call that will exhaust retries
    let _ = layer.layer(service).oneshot(request()).await;

    assert_metric_has_label("retry_calls_total", "retry", "exhausted_retry");
    assert_metric_has_label("retry_calls_total", "result", "exhausted");
}

#[tokio::test]
#[serial]
async fn retry_cancelled_metrics() {
    init_recorder();

    let layer = RetryLayer::builder().name("cancelled_retry").build();
    let service = executor_fn(|_req: HttpRequest| async {
        Ok::<_, Error>(HttpResponse::new(Body::empty()))
    });

    let token = CancellationToken::new();
    token.cancel();
    let mut req = request();
    req.extensions_mut().insert(token);

    let _ = layer.layer(service).oneshot(req).await;

    assert_metric_has_label("retry_calls_total", "retry", "cancelled_retry");
    assert_metric_has_label("retry_calls_total", "result", "cancelled");
}
