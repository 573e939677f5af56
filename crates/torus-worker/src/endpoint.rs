//! The worker call seam.
//!
//! [`WorkerEndpoint`] is the logical RPC surface a worker exposes to the
//! broker. Calls are blocking, like a synchronous RPC client stub; the
//! broker gets per-turn parallelism by calling every endpoint from its own
//! dispatch thread. The wire transport behind an endpoint is not this
//! crate's concern: [`LocalWorker`](crate::LocalWorker) is an in-process
//! implementation, and a network client would implement the same trait.

use std::sync::Arc;

use torus_core::{next_rows, Grid, GridError, Partition, RowBlock};

use crate::error::WorkerError;

/// One turn of work for one worker.
///
/// Carries the full current grid (boundary rows need neighbours from
/// other partitions) plus the row range to compute. `height` and `width`
/// are the dimensions the broker believes the grid has; a worker rejects
/// the request if they disagree with `grid`.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
    /// Full current grid, shared read-only.
    pub grid: Arc<Grid>,
    /// First row to compute (inclusive).
    pub start: usize,
    /// One past the last row to compute.
    pub end: usize,
    /// Total grid height.
    pub height: usize,
    /// Total grid width.
    pub width: usize,
}

impl GenerationRequest {
    /// Build the request for `partition` over `grid`.
    pub fn new(grid: Arc<Grid>, partition: &Partition) -> Self {
        let (height, width) = (grid.height(), grid.width());
        Self {
            grid,
            start: partition.start,
            end: partition.end,
            height,
            width,
        }
    }

    /// Run the Life rule for this request's rows.
    pub fn compute(&self) -> Result<RowBlock, GridError> {
        let actual = (self.grid.width(), self.grid.height());
        if (self.width, self.height) != actual {
            return Err(GridError::DimensionMismatch {
                declared: (self.width, self.height),
                actual,
            });
        }
        let cells = next_rows(&self.grid, self.start, self.end)?;
        Ok(RowBlock {
            start: self.start,
            end: self.end,
            width: self.width,
            cells,
        })
    }
}

/// A worker reachable by the broker.
///
/// Implementations must be callable from several threads at once; the
/// broker never issues two compute calls to the same endpoint in one turn.
pub trait WorkerEndpoint: Send + Sync {
    /// Human-readable label used in logs and errors.
    fn label(&self) -> &str;

    /// Compute the next generation for the request's rows.
    fn compute_next_generation(
        &self,
        request: &GenerationRequest,
    ) -> Result<RowBlock, WorkerError>;

    /// Acknowledge, then stop accepting calls after a short grace period.
    ///
    /// The grace period lets the acknowledgement (and any reply already
    /// being written) reach the caller before the listener closes.
    fn terminate_self(&self) -> Result<(), WorkerError>;
}
