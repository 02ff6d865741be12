//! Property tests for middleware chaining.
//!
//! Invariants tested:
//! - Middlewares see the request in list order
//! - Responses pass back through them in reverse order
//! - An empty chain behaves like the terminal executor

use http::HeaderValue;
use proptest::prelude::*;
use tokio::runtime::Runtime;
use tower::ServiceExt;
use tower_rest_core::{
    box_executor, chain, executor_fn, middleware_fn, Body, BoxExecutor, BoxMiddleware, Error,
    HttpRequest, HttpResponse,
};

fn append(value: Option<&HeaderValue>, tag: usize) -> HeaderValue {
    let prev = value.and_then(|v| v.to_str().ok()).unwrap_or_default();
    HeaderValue::from_str(&format!("{prev}{tag},")).unwrap()
}

/// Tags the request on the way in and the response on the way out.
fn tagging(tag: usize) -> BoxMiddleware {
    BoxMiddleware::new(middleware_fn(move |mut req: HttpRequest, next: BoxExecutor| async move {
        let value = append(req.headers().get("x-in"), tag);
        req.headers_mut().insert("x-in", value);
        let mut resp = next.oneshot(req).await?;
        let value = append(resp.headers().get("x-out"), tag);
        resp.headers_mut().insert("x-out", value);
        Ok::<_, Error>(resp)
    }))
}

fn terminal() -> BoxExecutor {
    box_executor(executor_fn(|req: HttpRequest| async move {
        let mut resp = HttpResponse::new(Body::empty());
        if let Some(seen) = req.headers().get("x-in") {
            resp.headers_mut().insert("x-in", seen.clone());
        }
        Ok::<_, Error>(resp)
    }))
}

fn expected(order: impl Iterator<Item = usize>) -> String {
    order.map(|tag| format!("{tag},")).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: the first middleware is outermost for any chain length
    #[test]
    fn chain_applies_in_list_order(len in 0usize..12) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let executor = chain(terminal(), (0..len).map(tagging).collect::<Vec<_>>());
            let resp = executor
                .oneshot(http::Request::new(Body::empty()))
                .await
                .unwrap();

            let header = |name: &str| {
                resp.headers()
                    .get(name)
                    .map(|v| v.to_str().unwrap().to_owned())
                    .unwrap_or_default()
            };
            prop_assert_eq!(header("x-in"), expected(0..len));
            prop_assert_eq!(header("x-out"), expected((0..len).rev()));
            Ok(())
        })?;
    }
}
