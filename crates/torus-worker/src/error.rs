//! Worker call errors.

use std::error::Error;
use std::fmt;

use torus_core::GridError;

/// Errors from calling a [`WorkerEndpoint`](crate::WorkerEndpoint).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkerError {
    /// The worker is not accepting calls (listener closed or never up).
    Unavailable {
        /// Label of the worker that refused the call.
        worker: String,
    },
    /// The worker accepted the call but went away before replying.
    Disconnected {
        /// Label of the worker that dropped the call.
        worker: String,
    },
    /// The worker refused the request as malformed.
    Rejected {
        /// Label of the refusing worker.
        worker: String,
        /// Why the request was refused.
        reason: String,
    },
    /// The worker's listener thread could not be started.
    SpawnFailed {
        /// Label of the worker being started.
        worker: String,
        /// Underlying OS error text.
        reason: String,
    },
}

impl WorkerError {
    pub(crate) fn rejected(worker: &str, err: GridError) -> Self {
        Self::Rejected {
            worker: worker.to_string(),
            reason: err.to_string(),
        }
    }
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { worker } => write!(f, "worker '{worker}' is unavailable"),
            Self::Disconnected { worker } => {
                write!(f, "worker '{worker}' disconnected before replying")
            }
            Self::Rejected { worker, reason } => {
                write!(f, "worker '{worker}' rejected request: {reason}")
            }
            Self::SpawnFailed { worker, reason } => {
                write!(f, "worker '{worker}' failed to start: {reason}")
            }
        }
    }
}

impl Error for WorkerError {}
