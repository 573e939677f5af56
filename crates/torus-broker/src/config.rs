//! Broker configuration, run requests, and validation.
//!
//! [`RunRequest::plan()`] checks a submitted run against the worker pool
//! and produces the partition plan in one pass, so a run that fails
//! validation never creates a session.

use std::error::Error;
use std::fmt;

use torus_core::{partition_rows, Grid, Partition, PartitionError};

// ── BrokerConfig ───────────────────────────────────────────────────

/// Configuration for a [`Broker`](crate::Broker).
#[derive(Clone, Debug)]
pub struct BrokerConfig {
    /// Delay between a full-shutdown request and the broker reporting
    /// [`BrokerState::Stopped`](crate::BrokerState::Stopped), in
    /// milliseconds. Gives in-flight replies time to reach clients.
    /// Default: 1000.
    pub shutdown_grace_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_ms: 1000,
        }
    }
}

// ── RunRequest ─────────────────────────────────────────────────────

/// A run submitted by a client.
///
/// `width` and `height` are the dimensions the client declares; they must
/// match the initial grid.
#[derive(Clone, Debug)]
pub struct RunRequest {
    /// Declared grid width.
    pub width: usize,
    /// Declared grid height.
    pub height: usize,
    /// Number of generations to compute.
    pub turns: u64,
    /// Initial grid (turn 0).
    pub grid: Grid,
}

impl RunRequest {
    /// A request whose declared dimensions are taken from `grid`.
    pub fn new(grid: Grid, turns: u64) -> Self {
        Self {
            width: grid.width(),
            height: grid.height(),
            turns,
            grid,
        }
    }

    /// Validate the request against a pool of `workers` and compute the
    /// partition plan for the run.
    pub fn plan(&self, workers: usize) -> Result<Vec<Partition>, ConfigError> {
        if workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyGrid {
                width: self.width,
                height: self.height,
            });
        }
        let actual = (self.grid.width(), self.grid.height());
        if actual != (self.width, self.height) {
            return Err(ConfigError::GridShapeMismatch {
                declared: (self.width, self.height),
                actual,
            });
        }
        Ok(partition_rows(self.height, workers)?)
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while validating a [`RunRequest`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The broker's worker pool is empty.
    NoWorkers,
    /// A declared dimension is zero.
    EmptyGrid {
        /// Declared width.
        width: usize,
        /// Declared height.
        height: usize,
    },
    /// The declared dimensions disagree with the initial grid.
    GridShapeMismatch {
        /// Declared `(width, height)`.
        declared: (usize, usize),
        /// The grid's actual `(width, height)`.
        actual: (usize, usize),
    },
    /// The grid cannot be split across the pool (more workers than rows).
    Partition(PartitionError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoWorkers => write!(f, "worker pool is empty"),
            Self::EmptyGrid { width, height } => {
                write!(f, "grid dimensions must be positive, got {width}x{height}")
            }
            Self::GridShapeMismatch { declared, actual } => write!(
                f,
                "declared {}x{} grid but initial grid is {}x{}",
                declared.0, declared.1, actual.0, actual.1
            ),
            Self::Partition(e) => write!(f, "partition: {e}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Partition(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PartitionError> for ConfigError {
    fn from(e: PartitionError) -> Self {
        Self::Partition(e)
    }
}
