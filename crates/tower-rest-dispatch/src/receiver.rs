use crate::DispatchError;
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

pin_project! {
    /// The receiving end of a dispatched task.
    ///
    /// Resolves to the task's value, or to [`DispatchError::TaskCancelled`]
    /// if the task ended without sending one. Dropping the receiver does not
    /// stop the task.
    #[derive(Debug)]
    pub struct AsyncReceiver<T> {
        #[pin]
        rx: oneshot::Receiver<T>,
    }
}

impl<T> AsyncReceiver<T> {
    pub(crate) fn new(rx: oneshot::Receiver<T>) -> Self {
        Self { rx }
    }

    /// A receiver that is already resolved to `value`.
    pub fn ready(value: T) -> Self {
        let (tx, rx) = oneshot::channel();
        // The receiver is alive, so this cannot fail.
        let _ = tx.send(value);
        Self { rx }
    }

    /// Takes the value without waiting.
    ///
    /// Returns `None` while the task is still running.
    pub fn try_recv(&mut self) -> Option<Result<T, DispatchError>> {
        match self.rx.try_recv() {
            Ok(value) => Some(Ok(value)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(DispatchError::TaskCancelled)),
        }
    }
}

impl<T> Future for AsyncReceiver<T> {
    type Output = Result<T, DispatchError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match this.rx.poll(cx) {
            Poll::Ready(Ok(value)) => Poll::Ready(Ok(value)),
            Poll::Ready(Err(_)) => Poll::Ready(Err(DispatchError::TaskCancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ready_resolves_immediately() {
        let mut rx = AsyncReceiver::ready(5);
        assert_eq!(rx.try_recv(), Some(Ok(5)));
    }

    #[tokio::test]
    async fn dropped_sender_is_cancellation() {
        let (tx, rx) = oneshot::channel::<u8>();
        drop(tx);
        assert_eq!(AsyncReceiver::new(rx).await, Err(DispatchError::TaskCancelled));
    }

    #[tokio::test]
    async fn try_recv_reports_pending() {
        let (tx, rx) = oneshot::channel();
        let mut rx = AsyncReceiver::new(rx);
        assert_eq!(rx.try_recv(), None);
        tx.send("done").unwrap();
        assert_eq!(rx.try_recv(), Some(Ok("done")));
    }
}
