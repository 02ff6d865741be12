//! Spawner trait for running dispatched calls.

use std::future::Future;
use tokio::task::JoinHandle;

/// Something that can run a future as an independent task.
///
/// # Example
///
/// ```rust,no_run
/// use tower_rest_dispatch::{Dispatcher, Spawner};
/// use tokio::runtime::Handle;
///
/// // Dispatch onto a specific runtime.
/// let dispatcher = Dispatcher::with_spawner(Handle::current());
/// ```
pub trait Spawner: Clone + Send + Sync + 'static {
    fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static;
}

impl Spawner for tokio::runtime::Handle {
    fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::runtime::Handle::spawn(self, future)
    }
}

/// Spawns on whichever runtime is current when a call is dispatched.
///
/// Dispatching from outside a tokio runtime panics.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSpawner;

impl Spawner for TokioSpawner {
    fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::spawn(future)
    }
}

/// Spawns on the runtime that was current when this value was created.
#[derive(Debug, Clone)]
pub struct CurrentRuntime {
    handle: tokio::runtime::Handle,
}

impl CurrentRuntime {
    /// # Panics
    ///
    /// Panics if called from outside a tokio runtime.
    pub fn new() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl Default for CurrentRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl Spawner for CurrentRuntime {
    fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }
}
