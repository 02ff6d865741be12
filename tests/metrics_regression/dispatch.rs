//! Dispatch metrics regression tests

use super::helpers::*;
use serial_test::serial;
use tower_rest_dispatch::Dispatcher;

#[tokio::test]
#[serial]
async fn dispatch_metrics_exist() {
    init_recorder();

    let dispatcher = Dispatcher::new();
    let value = dispatcher.dispatch(async { 1 }).await;
    assert_eq!(value, Ok(1));

    assert_counter_exists("dispatch_tasks_total");
    assert_metric_has_label("dispatch_tasks_total", "result", "delivered");
}

#[tokio::test]
#[serial]
async fn discarded_results_are_counted() {
    init_recorder();

    let dispatcher = Dispatcher::new();
    let (tx, rx) = tokio::sync::oneshot::channel();
    // The receiver is gone before the task first runs.
    drop(dispatcher.dispatch(async move {
        let _ = tx.send(());
    }));
    rx.await.unwrap();
    tokio::task::yield_now().await;

    assert_metric_has_label("dispatch_tasks_total", "result", "discarded");
}
