use std::time::Duration;
use tower_rest_core::events::{PipelineEvent, RequestTarget};

/// A decision taken by the retry layer for one call.
#[derive(Debug, Clone)]
pub struct RetryEvent {
    /// Name of the retry layer instance.
    pub layer_name: String,
    /// The request being retried.
    pub target: RequestTarget,
    /// Time since the call entered the layer.
    pub elapsed: Duration,
    pub outcome: RetryOutcome,
}

/// What the retry layer decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// Another attempt will be made after `delay`.
    ///
    /// `attempt` is the one-based number of the attempt that failed.
    Retry { attempt: usize, delay: Duration },
    /// An attempt produced a final response.
    Success { attempts: usize },
    /// Every attempt failed.
    Exhausted { attempts: usize },
    /// The cancellation token fired before attempt `attempt` (one-based).
    Cancelled { attempt: usize },
}

impl PipelineEvent for RetryEvent {
    fn kind(&self) -> &'static str {
        match self.outcome {
            RetryOutcome::Retry { .. } => "retry",
            RetryOutcome::Success { .. } => "success",
            RetryOutcome::Exhausted { .. } => "exhausted",
            RetryOutcome::Cancelled { .. } => "cancelled",
        }
    }

    fn layer_name(&self) -> &str {
        &self.layer_name
    }

    fn target(&self) -> &RequestTarget {
        &self.target
    }

    fn elapsed(&self) -> Duration {
        self.elapsed
    }
}
