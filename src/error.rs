use crate::utils::panic_message;
use std::{any::Any, io};
use thiserror::Error;

/// Error returned by the fan-out entry points.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No task produced a value accepted by the success predicate before the
    /// merged stream closed.
    #[error("no task produced a successful result")]
    NoSuccess,
    /// The operation was abandoned because its cancellation token fired.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    /// The computation panicked instead of returning.
    #[error(transparent)]
    Panicked(#[from] TaskPanic),
    /// The OS refused to start a thread.
    #[error("failed to spawn thread `{name}`")]
    Spawn {
        /// Name the thread would have carried.
        name: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

/// Reason reported by [`CancelToken::err`](crate::cancel::CancelToken::err).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cancelled {
    /// [`CancelToken::cancel`](crate::cancel::CancelToken::cancel) was called.
    #[error("operation was cancelled")]
    Cancelled,
    /// The token's deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// A task panicked; carries the panic message when it was a string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("task panicked: {message}")]
pub struct TaskPanic {
    message: String,
}

impl TaskPanic {
    pub(crate) fn from_payload(payload: &(dyn Any + Send)) -> Self {
        Self {
            message: panic_message(payload),
        }
    }

    /// The panic message, or a placeholder for non-string payloads.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}
