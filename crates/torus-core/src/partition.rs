//! Static row partitioning and stitching of partitioned results.
//!
//! A run splits the grid into one contiguous row range per worker.
//! Ranges are computed once per run and never change; each worker's
//! output is stitched back by partition ordinal, not by arrival order.

use std::ops::Range;

use crate::error::{PartitionError, StitchError};
use crate::grid::Grid;

/// A half-open row range `[start, end)` assigned to one worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Partition {
    /// First row (inclusive).
    pub start: usize,
    /// One past the last row.
    pub end: usize,
    /// Ordinal of the worker this range belongs to.
    pub index: usize,
    /// Total number of workers in the run.
    pub count: usize,
}

impl Partition {
    /// Number of rows in the range.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the range is empty. Never true for ranges produced by
    /// [`partition_rows`].
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The range as a `Range<usize>`.
    pub fn rows(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Next-generation rows returned by a worker for one partition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowBlock {
    /// First row (inclusive).
    pub start: usize,
    /// One past the last row.
    pub end: usize,
    /// Row width in cells.
    pub width: usize,
    /// Row-major bytes for rows `[start, end)`.
    pub cells: Vec<u8>,
}

impl RowBlock {
    /// Number of rows the block claims to cover.
    pub fn row_count(&self) -> usize {
        self.end.saturating_sub(self.start)
    }
}

/// Split `height` rows across `workers` contiguous ranges.
///
/// Every range but the last has `height / workers` rows; the last range
/// absorbs the remainder. Fails when `workers == 0` or `height < workers`.
pub fn partition_rows(height: usize, workers: usize) -> Result<Vec<Partition>, PartitionError> {
    if workers == 0 {
        return Err(PartitionError::NoWorkers);
    }
    if height < workers {
        return Err(PartitionError::TooFewRows { height, workers });
    }
    let slice = height / workers;
    Ok((0..workers)
        .map(|index| Partition {
            start: index * slice,
            end: if index + 1 == workers {
                height
            } else {
                (index + 1) * slice
            },
            index,
            count: workers,
        })
        .collect())
}

/// Reassemble a full grid from per-partition row blocks.
///
/// `blocks[i]` must be the output for `partitions[i]`; blocks are
/// concatenated in that order. Every block is checked against its
/// partition before any bytes are copied, so a malformed block never
/// yields a grid.
pub fn stitch(
    width: usize,
    height: usize,
    partitions: &[Partition],
    blocks: Vec<RowBlock>,
) -> Result<Grid, StitchError> {
    if blocks.len() != partitions.len() {
        return Err(StitchError::BlockCountMismatch {
            expected: partitions.len(),
            actual: blocks.len(),
        });
    }
    for (partition, block) in partitions.iter().zip(&blocks) {
        if (block.start, block.end) != (partition.start, partition.end) {
            return Err(StitchError::RangeMismatch {
                index: partition.index,
                expected: (partition.start, partition.end),
                actual: (block.start, block.end),
            });
        }
        let expected = partition.len() * width;
        if block.width != width || block.cells.len() != expected {
            return Err(StitchError::CellCountMismatch {
                index: partition.index,
                expected,
                actual: block.cells.len(),
            });
        }
    }

    let mut cells = Vec::with_capacity(width * height);
    for block in blocks {
        cells.extend(block.cells);
    }
    Ok(Grid::from_bytes(width, height, cells)?)
}
