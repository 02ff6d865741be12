use std::fmt;

/// Errors reported by a dispatched task's receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The task ended without producing a value (it panicked or its
    /// runtime shut down).
    TaskCancelled,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TaskCancelled => write!(f, "dispatched task was cancelled"),
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<DispatchError> for tower_rest_core::Error {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::TaskCancelled => tower_rest_core::Error::TaskCancelled,
        }
    }
}
