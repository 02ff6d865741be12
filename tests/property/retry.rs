//! Property tests for the retry layer.
//!
//! Invariants tested:
//! - Never exceeds max_attempts
//! - Succeeds on first success
//! - Client errors are never retried
//! - Retry-After seconds parse exactly

use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tower::{Layer, ServiceExt};
use tower_rest_core::{
    box_executor, executor_fn, Body, BoxExecutor, Error, HttpRequest, HttpResponse,
};
use tower_rest_retry::{parse_retry_after, RetryLayer};

/// Fails with a transport error `failures` times, then answers `status`.
fn flaky(calls: Arc<AtomicUsize>, failures: usize, status: u16) -> BoxExecutor {
    box_executor(executor_fn(move |_req: HttpRequest| {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        async move {
            if n < failures {
                return Err(Error::transport("connection reset"));
            }
            let mut resp = HttpResponse::new(Body::empty());
            *resp.status_mut() = http::StatusCode::from_u16(status).unwrap();
            Ok::<_, Error>(resp)
        }
    }))
}

fn layer(max_attempts: usize) -> RetryLayer {
    RetryLayer::builder()
        .max_attempts(max_attempts)
        .fixed_backoff(Duration::from_millis(1))
        .build()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    /// Property: Retry never exceeds max_attempts
    #[test]
    fn retry_respects_max_attempts(max_attempts in 1usize..=6) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let calls = Arc::new(AtomicUsize::new(0));
            let svc = layer(max_attempts).layer(flaky(Arc::clone(&calls), usize::MAX, 200));

            let result = svc.oneshot(http::Request::new(Body::empty())).await;
            match result {
                Err(Error::RetriesExhausted { attempts, .. }) => {
                    prop_assert_eq!(attempts, max_attempts)
                }
                other => prop_assert!(false, "unexpected outcome: {:?}", other.map(|r| r.status())),
            }
            prop_assert_eq!(calls.load(Ordering::SeqCst), max_attempts);
            Ok(())
        })?;
    }

    /// Property: Success on Nth attempt stops retrying
    #[test]
    fn retry_stops_on_success(max_attempts in 1usize..=6, failures in 0usize..6) {
        prop_assume!(failures < max_attempts);
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let calls = Arc::new(AtomicUsize::new(0));
            let svc = layer(max_attempts).layer(flaky(Arc::clone(&calls), failures, 200));

            let resp = svc.oneshot(http::Request::new(Body::empty())).await;
            prop_assert!(resp.is_ok());
            prop_assert_eq!(calls.load(Ordering::SeqCst), failures + 1);
            Ok(())
        })?;
    }

    /// Property: 4xx other than 429 is final on the first attempt
    #[test]
    fn client_errors_are_not_retried(status in 400u16..500, max_attempts in 2usize..=5) {
        prop_assume!(status != 429);
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let calls = Arc::new(AtomicUsize::new(0));
            let svc = layer(max_attempts).layer(flaky(Arc::clone(&calls), 0, status));

            let resp = svc.oneshot(http::Request::new(Body::empty())).await.unwrap();
            prop_assert_eq!(resp.status().as_u16(), status);
            prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
            Ok(())
        })?;
    }

    /// Property: delay-seconds values parse to exactly that many seconds
    #[test]
    fn retry_after_seconds_round_trip(secs in any::<u32>(), pad in " {0,3}") {
        let value = format!("{pad}{secs}{pad}");
        prop_assert_eq!(
            parse_retry_after(&value, None).unwrap(),
            Duration::from_secs(u64::from(secs))
        );
    }
}
