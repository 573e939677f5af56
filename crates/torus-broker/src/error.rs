//! Submission and run failure types.

use std::error::Error;
use std::fmt;

use torus_core::{SessionId, StitchError};
use torus_worker::WorkerError;

use crate::config::ConfigError;

/// Error returned by [`Broker::submit_run`](crate::Broker::submit_run).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitError {
    /// A full shutdown has been requested; no new runs are accepted.
    ShuttingDown,
    /// The previous run is still running or paused and has not been asked
    /// to terminate.
    SessionActive {
        /// The session still in progress.
        session: SessionId,
    },
    /// The request failed validation.
    Config(ConfigError),
    /// A run or dispatch thread could not be spawned.
    ThreadSpawnFailed {
        /// Underlying OS error text.
        reason: String,
    },
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShuttingDown => write!(f, "broker is shutting down"),
            Self::SessionActive { session } => {
                write!(f, "session {session} is still in progress")
            }
            Self::Config(e) => write!(f, "invalid run: {e}"),
            Self::ThreadSpawnFailed { reason } => write!(f, "thread spawn failed: {reason}"),
        }
    }
}

impl Error for SubmitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for SubmitError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Why a run was abandoned.
///
/// The turn that hit the error is never published; the session keeps the
/// last consistent turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunError {
    /// A worker call failed during dispatch.
    Worker {
        /// Ordinal of the failing worker (and its partition).
        index: usize,
        /// The worker's label.
        label: String,
        /// The call error.
        source: WorkerError,
    },
    /// A worker returned rows that do not fit its partition.
    Stitch(StitchError),
    /// The run loop thread exited without reporting an outcome.
    LoopPanicked,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Worker { index, label, source } => {
                write!(f, "worker {index} ('{label}') failed: {source}")
            }
            Self::Stitch(e) => write!(f, "stitch failed: {e}"),
            Self::LoopPanicked => write!(f, "run loop exited without an outcome"),
        }
    }
}

impl Error for RunError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Worker { source, .. } => Some(source),
            Self::Stitch(e) => Some(e),
            Self::LoopPanicked => None,
        }
    }
}

impl From<StitchError> for RunError {
    fn from(e: StitchError) -> Self {
        Self::Stitch(e)
    }
}
