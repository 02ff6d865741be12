use crate::{AsyncReceiver, DispatchError, Spawner, TokioSpawner};
use std::future::Future;
use tokio::sync::oneshot;

#[cfg(feature = "tracing")]
use tracing::debug;

/// Runs calls as independent tasks and hands their results back through
/// single-slot channels.
///
/// Each dispatched task sends exactly one value. The producer never waits
/// for the consumer; if the receiver was dropped the value is discarded.
/// Nothing here imposes a timeout.
///
/// # Examples
///
/// ```
/// use tower_rest_dispatch::Dispatcher;
///
/// # #[tokio::main]
/// # async fn main() {
/// let dispatcher = Dispatcher::new();
/// let results = dispatcher
///     .dispatch_group((1..=3).map(|n| async move { n * 10 }))
///     .await
///     .unwrap();
///
/// let values: Vec<_> = results.into_iter().map(Result::unwrap).collect();
/// assert_eq!(values, vec![10, 20, 30]);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Dispatcher<S = TokioSpawner> {
    spawner: S,
}

impl Dispatcher {
    /// Dispatches onto the tokio runtime current at call time.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: Spawner> Dispatcher<S> {
    pub fn with_spawner(spawner: S) -> Self {
        Self { spawner }
    }

    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    /// Runs `future` as its own task.
    pub fn dispatch<F>(&self, future: F) -> AsyncReceiver<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.spawner.spawn(async move {
            let delivered = tx.send(future.await).is_ok();
            record(delivered);
        });
        AsyncReceiver::new(rx)
    }

    /// Awaits `futures` in the given order on a joiner task and delivers
    /// their outputs as one vector in that same order.
    ///
    /// Completion order does not matter: an output that is ready early waits
    /// for the ones before it.
    pub fn join<I, F>(&self, futures: I) -> AsyncReceiver<Vec<F::Output>>
    where
        I: IntoIterator<Item = F>,
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let futures: Vec<F> = futures.into_iter().collect();
        self.dispatch(async move {
            let mut outputs = Vec::with_capacity(futures.len());
            for future in futures {
                outputs.push(future.await);
            }
            outputs
        })
    }

    /// Dispatches every future, then joins their receivers.
    ///
    /// The `i`th element of the result belongs to the `i`th input. A task
    /// that dies reports [`DispatchError::TaskCancelled`] in its slot
    /// without disturbing the others.
    pub fn dispatch_group<I, F>(
        &self,
        futures: I,
    ) -> AsyncReceiver<Vec<Result<F::Output, DispatchError>>>
    where
        I: IntoIterator<Item = F>,
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let receivers: Vec<_> = futures.into_iter().map(|f| self.dispatch(f)).collect();
        self.join(receivers)
    }
}

#[cfg_attr(
    not(any(feature = "tracing", feature = "metrics")),
    allow(unused_variables)
)]
fn record(delivered: bool) {
    #[cfg(feature = "tracing")]
    {
        if !delivered {
            debug!("dispatched result discarded, receiver was dropped");
        }
    }

    #[cfg(feature = "metrics")]
    {
        let result = if delivered { "delivered" } else { "discarded" };
        metrics::counter!("dispatch_tasks_total", "result" => result).increment(1);
    }
}
