//! Asynchronous dispatch for tower-rest calls.
//!
//! A [`Dispatcher`] runs each call as an independent task and returns an
//! [`AsyncReceiver`], a single-slot future that resolves to the call's
//! result. Groups of calls fan out to one task each and fan back in through a
//! joiner task that preserves input order, whatever order the calls finish in.
//!
//! Tasks are spawned through a [`Spawner`]. The default spawns on the tokio
//! runtime that is current when a call is dispatched; any
//! [`tokio::runtime::Handle`] or a captured [`CurrentRuntime`] can be used
//! instead.
//!
//! ## Feature Flags
//!
//! - `tracing`: logs discarded results
//! - `metrics`: counts dispatched tasks as `dispatch_tasks_total{result}`
//!   where `result` is `delivered` or `discarded`

mod dispatcher;
mod error;
mod receiver;
mod spawner;

pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use receiver::AsyncReceiver;
pub use spawner::{CurrentRuntime, Spawner, TokioSpawner};
