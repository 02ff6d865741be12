//! Observability hooks for pipeline layers.
//!
//! A layer that makes decisions on the caller's behalf (retrying, giving up,
//! honouring cancellation) reports each decision as a [`PipelineEvent`]. The
//! event names the request it concerns through a [`RequestTarget`] and says
//! how long the call has been inside the layer, so hooks can correlate
//! events without access to the request itself.
//!
//! Hooks are plain closures registered on an [`EventHooks`] list. They run
//! inline on the calling task and should be quick.

use http::{Method, Uri};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// The method and URI of the request an event refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    method: Method,
    uri: Uri,
}

impl RequestTarget {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self { method, uri }
    }

    /// Copies the method and URI out of `req`.
    pub fn of<B>(req: &http::Request<B>) -> Self {
        Self::new(req.method().clone(), req.uri().clone())
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }
}

impl fmt::Display for RequestTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.uri)
    }
}

/// An event emitted by a pipeline layer while handling one call.
pub trait PipelineEvent: Send + Sync + fmt::Debug {
    /// Short machine-readable kind, e.g. `"retry"` or `"exhausted"`.
    fn kind(&self) -> &'static str;

    /// Name of the layer instance that emitted the event.
    fn layer_name(&self) -> &str;

    /// The request being handled.
    fn target(&self) -> &RequestTarget;

    /// Time since the call entered the layer.
    fn elapsed(&self) -> Duration;
}

type Hook<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// An ordered list of event hooks.
pub struct EventHooks<E> {
    hooks: Vec<Hook<E>>,
}

impl<E: PipelineEvent> EventHooks<E> {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Registers `hook`; hooks run in registration order.
    pub fn add<F>(&mut self, hook: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.hooks.push(Arc::new(hook));
    }

    /// Runs every hook with `event`.
    ///
    /// A panicking hook is contained; the remaining hooks still run.
    pub fn emit(&self, event: &E) {
        for hook in &self.hooks {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| hook(event)));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }
}

impl<E> Clone for EventHooks<E> {
    fn clone(&self) -> Self {
        Self {
            hooks: self.hooks.clone(),
        }
    }
}

impl<E: PipelineEvent> Default for EventHooks<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventHooks<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHooks")
            .field("len", &self.hooks.len())
            .finish()
    }
}
